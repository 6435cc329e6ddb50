//! The engine proper: instance/device bootstrap, windowing, swapchain,
//! per-frame synchronization, cameras, the active engine variant, and the
//! `Renderer` facade tying them together.

mod camera;
mod context;
mod frame;
mod queue_family;
mod renderer;
mod swapchain;
mod variants;
mod window;

pub use camera::{Camera, CameraContainer};
pub use context::VulkanContext;
pub use frame::FrameRecord;
pub use queue_family::QueueFamilies;
pub use renderer::Renderer;
pub use swapchain::Swapchain;
pub use variants::{EngineVariant, MeshBundleSource};
pub use window::Window;

//! # Terra
//!
//! A Vulkan 1.3 real-time rendering engine: dynamic rendering,
//! synchronization2, descriptor buffers, and three interchangeable draw
//! strategies (per-model vertex-shader draws, GPU-culled indirect draws,
//! and mesh-shader draws) behind one [`engine::Renderer`] facade.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use terra::{RendererConfig, Renderer};
//!
//! let config = RendererConfig::default();
//! let mut renderer = Renderer::new(&config)?;
//! renderer.finalise_initialisation()?;
//! while !renderer.should_close() {
//!     renderer.poll_events();
//!     renderer.render()?;
//! }
//! # Ok::<(), terra::Error>(())
//! ```

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments, clippy::module_name_repetitions)]

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod external;
pub mod foundation;
pub mod handles;
pub mod memory;
pub mod mesh;
pub mod model;
pub mod pipeline;
pub mod render_pass;
pub mod resources;
pub mod shared_buffer;
pub mod staging;
pub mod sync;

pub use config::{RenderEngineKind, RendererConfig};
pub use engine::{Camera, Renderer};
pub use error::{Error, Result};
pub use handles::{
    CameraKey, ExternalBufferKey, ExternalTextureKey, MeshBundleKey, ModelBundleKey, ModelKey,
    PipelineKey, RenderPassKey, TextureKey,
};

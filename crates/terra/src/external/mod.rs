//! External resource factory and manager (spec §4.10): application-facing
//! GPU buffers/textures outside the internal shared-buffer/mesh pipeline —
//! things like a UI render target or an SSBO the application writes
//! directly.

mod factory;
mod manager;

pub use factory::{ExternalBufferType, ExternalTextureFlags, ExternalTextureType, VkExternalResourceFactory};
pub use manager::{ExternalBindingDetails, VkExternalResourceManager};

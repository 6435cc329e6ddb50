//! GPU resource wrappers: buffers, textures, image views, samplers.

mod buffer;
mod image_view;
mod sampler;
mod texture;

pub use buffer::Buffer;
pub use image_view::ImageView;
pub use sampler::Sampler;
pub use texture::Texture;

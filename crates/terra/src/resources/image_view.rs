//! Non-owning view into a [`Texture`](super::texture::Texture).

use ash::{vk, Device};

use crate::error::{Result, VkResultExt};

use super::texture::Texture;

/// A `VkImageView` over a sub-range of a texture. Samplers are independent
/// objects per spec §3.
pub struct ImageView {
    device: Device,
    view: vk::ImageView,
    aspect: vk::ImageAspectFlags,
    base_mip: u32,
    level_count: u32,
}

impl ImageView {
    pub fn new(
        device: Device,
        texture: &Texture,
        aspect: vk::ImageAspectFlags,
        base_mip: u32,
        level_count: u32,
    ) -> Result<Self> {
        let view_type = if texture.extent().depth > 1 {
            vk::ImageViewType::TYPE_3D
        } else {
            vk::ImageViewType::TYPE_2D
        };
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(texture.handle())
            .view_type(view_type)
            .format(texture.format())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: base_mip,
                level_count,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view =
            unsafe { device.create_image_view(&create_info, None) }.vk_ctx("creating image view")?;

        Ok(Self {
            device,
            view,
            aspect,
            base_mip,
            level_count,
        })
    }

    pub fn handle(&self) -> vk::ImageView {
        self.view
    }

    pub fn aspect(&self) -> vk::ImageAspectFlags {
        self.aspect
    }

    pub fn base_mip(&self) -> u32 {
        self.base_mip
    }

    pub fn level_count(&self) -> u32 {
        self.level_count
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image_view(self.view, None);
        }
    }
}

//! GPU image resource.

use ash::{vk, Device};

use crate::error::{Result, VkResultExt};
use crate::memory::{Allocation, MemoryManager};

/// 2D or 3D image resource, exclusively owning its memory allocation.
pub struct Texture {
    device: Device,
    image: vk::Image,
    width: u32,
    height: u32,
    depth: u32,
    mip_levels: u32,
    format: vk::Format,
    usage: vk::ImageUsageFlags,
    allocation: Allocation,
}

/// The byte cost of one texel for the closed set of formats this engine's
/// upload paths understand. `0` for anything else, per spec §3.
fn bytes_per_texel(format: vk::Format) -> u32 {
    match format {
        vk::Format::R8G8B8A8_UNORM
        | vk::Format::R8G8B8A8_SRGB
        | vk::Format::B8G8R8A8_UNORM
        | vk::Format::B8G8R8A8_SRGB => 4,
        _ => 0,
    }
}

impl Texture {
    pub fn new(
        device: Device,
        memory: &mut MemoryManager,
        width: u32,
        height: u32,
        depth: u32,
        mip_levels: u32,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        queue_family_indices: &[u32],
    ) -> Result<Self> {
        let image_type = if depth > 1 {
            vk::ImageType::TYPE_3D
        } else {
            vk::ImageType::TYPE_2D
        };
        let sharing_mode = if queue_family_indices.len() > 1 {
            vk::SharingMode::CONCURRENT
        } else {
            vk::SharingMode::EXCLUSIVE
        };

        let mut create_info = vk::ImageCreateInfo::builder()
            .image_type(image_type)
            .format(format)
            .extent(vk::Extent3D {
                width,
                height,
                depth,
            })
            .mip_levels(mip_levels.max(1))
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(sharing_mode)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        if sharing_mode == vk::SharingMode::CONCURRENT {
            create_info = create_info.queue_family_indices(queue_family_indices);
        }

        let image =
            unsafe { device.create_image(&create_info, None) }.vk_ctx("creating image")?;
        let allocation =
            match memory.allocate_for_image(image, vk::MemoryPropertyFlags::DEVICE_LOCAL) {
                Ok(a) => a,
                Err(e) => {
                    unsafe { device.destroy_image(image, None) };
                    return Err(e);
                }
            };

        log::debug!("created texture {width}x{height}x{depth}, format {format:?}, mips {mip_levels}");
        Ok(Self {
            device,
            image,
            width,
            height,
            depth,
            mip_levels: mip_levels.max(1),
            format,
            usage,
            allocation,
        })
    }

    pub fn handle(&self) -> vk::Image {
        self.image
    }

    pub fn extent(&self) -> vk::Extent3D {
        vk::Extent3D {
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn usage(&self) -> vk::ImageUsageFlags {
        self.usage
    }

    /// Byte size of the tightly packed pixel data this texture would hold
    /// at mip 0, for the closed set of formats the staging pipeline
    /// understands. `0` for unsupported formats (e.g. compressed, depth).
    pub fn buffer_size(&self) -> u64 {
        u64::from(bytes_per_texel(self.format)) * u64::from(self.width) * u64::from(self.height) * u64::from(self.depth)
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image(self.image, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_size_defined_only_for_closed_rgba_set() {
        assert_eq!(bytes_per_texel(vk::Format::R8G8B8A8_UNORM), 4);
        assert_eq!(bytes_per_texel(vk::Format::B8G8R8A8_SRGB), 4);
        assert_eq!(bytes_per_texel(vk::Format::D32_SFLOAT), 0);
        assert_eq!(bytes_per_texel(vk::Format::BC7_UNORM_BLOCK), 0);
    }
}

//! Independent sampler object (spec §3: "Samplers are independent").

use ash::{vk, Device};

use crate::error::{Result, VkResultExt};

/// RAII wrapper around a `VkSampler`.
pub struct Sampler {
    device: Device,
    sampler: vk::Sampler,
}

impl Sampler {
    pub fn new(device: Device, filter: vk::Filter, address_mode: vk::SamplerAddressMode) -> Result<Self> {
        let create_info = vk::SamplerCreateInfo::builder()
            .mag_filter(filter)
            .min_filter(filter)
            .address_mode_u(address_mode)
            .address_mode_v(address_mode)
            .address_mode_w(address_mode)
            .anisotropy_enable(false)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE);

        let sampler =
            unsafe { device.create_sampler(&create_info, None) }.vk_ctx("creating sampler")?;
        Ok(Self { device, sampler })
    }

    /// The engine's default sampler: linear filtering, repeat addressing —
    /// always resident at bindless slot 0 (spec §8 round-trip property).
    pub fn default_sampler(device: Device) -> Result<Self> {
        Self::new(device, vk::Filter::LINEAR, vk::SamplerAddressMode::REPEAT)
    }

    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

//! Queue family discovery (spec §5): the engine wants three logical queues
//! (graphics, compute, transfer) that may or may not map to distinct
//! families — discovered once at init, not assumed.

use ash::vk;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub compute: u32,
    pub transfer: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Prefers a dedicated transfer-only family (no GRAPHICS/COMPUTE bits)
    /// and a dedicated compute-only family when the hardware exposes them,
    /// since those are typically the families that overlap DMA/async-compute
    /// engines rather than the main graphics engine.
    pub fn discover(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        surface_loader: &ash::extensions::khr::Surface,
        surface: vk::SurfaceKHR,
    ) -> Result<Self> {
        let families =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

        let graphics = families
            .iter()
            .position(|f| f.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .ok_or_else(|| Error::InvalidOperation("no graphics queue family".into()))? as u32;

        let transfer = families
            .iter()
            .position(|f| {
                f.queue_flags.contains(vk::QueueFlags::TRANSFER)
                    && !f.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                    && !f.queue_flags.contains(vk::QueueFlags::COMPUTE)
            })
            .map_or(graphics, |i| i as u32);

        let compute = families
            .iter()
            .position(|f| {
                f.queue_flags.contains(vk::QueueFlags::COMPUTE)
                    && !f.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            })
            .map_or(graphics, |i| i as u32);

        let mut present = None;
        for (index, _) in families.iter().enumerate() {
            let supported = unsafe {
                surface_loader.get_physical_device_surface_support(physical_device, index as u32, surface)
            }
            .map_err(|e| Error::api("querying surface support", e))?;
            if supported {
                present = Some(index as u32);
                break;
            }
        }
        let present = present.ok_or_else(|| Error::InvalidOperation("no present-capable queue family".into()))?;

        Ok(Self { graphics, compute, transfer, present })
    }

    /// Deduplicated family indices, for `VkDeviceQueueCreateInfo`.
    pub fn unique_indices(&self) -> Vec<u32> {
        let mut indices = vec![self.graphics, self.compute, self.transfer, self.present];
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

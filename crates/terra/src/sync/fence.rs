//! Fences used to bound in-flight frames.

use ash::{vk, Device};

use crate::error::{Result, VkResultExt};

/// RAII fence wrapper. Waits use `u64::MAX` per spec §5 (no cooperative
/// cancellation of a submitted frame).
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    pub fn new(device: Device, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        let fence = unsafe { device.create_fence(&create_info, None) }.vk_ctx("creating fence")?;
        Ok(Self { device, fence })
    }

    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    pub fn wait(&self) -> Result<()> {
        unsafe { self.device.wait_for_fences(&[self.fence], true, u64::MAX) }
            .vk_ctx("waiting on fence")
    }

    pub fn reset(&self) -> Result<()> {
        unsafe { self.device.reset_fences(&[self.fence]) }.vk_ctx("resetting fence")
    }

    pub fn is_signaled(&self) -> Result<bool> {
        unsafe { self.device.get_fence_status(self.fence) }.vk_ctx("querying fence status")
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe { self.device.destroy_fence(self.fence, None) };
    }
}

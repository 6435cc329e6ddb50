//! Binary and timeline semaphores.

use ash::{vk, Device};

use crate::error::{Result, VkResultExt};

/// A binary semaphore: used for present signalling and the
/// swap-image-acquired wait (spec §4.5).
pub struct BinarySemaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl BinarySemaphore {
    pub fn new(device: Device) -> Result<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe { device.create_semaphore(&create_info, None) }
            .vk_ctx("creating binary semaphore")?;
        Ok(Self { device, semaphore })
    }

    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for BinarySemaphore {
    fn drop(&mut self) {
        unsafe { self.device.destroy_semaphore(self.semaphore, None) };
    }
}

/// A Vulkan 1.2 timeline semaphore with a monotonically increasing 64-bit
/// value, used for cross-queue ordering (transfer `T[i]`, compute `C[i]`).
pub struct TimelineSemaphore {
    device: Device,
    semaphore: vk::Semaphore,
    next_value: u64,
}

impl TimelineSemaphore {
    pub fn new(device: Device, initial_value: u64) -> Result<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::builder()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let create_info = vk::SemaphoreCreateInfo::builder().push_next(&mut type_info);
        let semaphore = unsafe { device.create_semaphore(&create_info, None) }
            .vk_ctx("creating timeline semaphore")?;
        Ok(Self {
            device,
            semaphore,
            next_value: initial_value + 1,
        })
    }

    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }

    /// Allocate the next monotonically increasing signal value, for the
    /// caller to use both as the submission's `signal` value and to store
    /// for a later `wait`.
    pub fn next_signal_value(&mut self) -> u64 {
        let value = self.next_value;
        self.next_value += 1;
        value
    }

    pub fn current_value(&self) -> Result<u64> {
        unsafe { self.device.get_semaphore_counter_value(self.semaphore) }
            .vk_ctx("querying timeline semaphore value")
    }

    pub fn wait(&self, value: u64, timeout: u64) -> Result<()> {
        let wait_info = vk::SemaphoreWaitInfo::builder()
            .semaphores(std::slice::from_ref(&self.semaphore))
            .values(std::slice::from_ref(&value));
        unsafe { self.device.wait_semaphores(&wait_info, timeout) }
            .vk_ctx("waiting on timeline semaphore")
    }
}

impl Drop for TimelineSemaphore {
    fn drop(&mut self) {
        unsafe { self.device.destroy_semaphore(self.semaphore, None) };
    }
}

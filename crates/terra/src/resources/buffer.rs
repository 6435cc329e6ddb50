//! GPU buffer resource.

use ash::{vk, Device};

use crate::error::{Result, VkResultExt};
use crate::memory::{Allocation, MemoryManager};

/// A Vulkan buffer bound to a suballocated [`Allocation`].
///
/// Exclusively owned: dropping it destroys the `VkBuffer` and releases the
/// allocation back to its pool's buddy allocator.
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    allocation: Allocation,
}

impl Buffer {
    /// Create a buffer of `size` bytes. `SHADER_DEVICE_ADDRESS` usage is
    /// always implied per spec §3. Sharing mode is `CONCURRENT` when more
    /// than one queue family index is given, else `EXCLUSIVE`.
    pub fn new(
        device: Device,
        memory: &mut MemoryManager,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        property: vk::MemoryPropertyFlags,
        queue_family_indices: &[u32],
    ) -> Result<Self> {
        let usage = usage | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
        let sharing_mode = if queue_family_indices.len() > 1 {
            vk::SharingMode::CONCURRENT
        } else {
            vk::SharingMode::EXCLUSIVE
        };

        let mut create_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(sharing_mode);
        if sharing_mode == vk::SharingMode::CONCURRENT {
            create_info = create_info.queue_family_indices(queue_family_indices);
        }

        let buffer =
            unsafe { device.create_buffer(&create_info, None) }.vk_ctx("creating buffer")?;
        let allocation = match memory.allocate_for_buffer(buffer, property) {
            Ok(a) => a,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        log::debug!("created buffer: {size} bytes, usage {usage:?}");
        Ok(Self {
            device,
            buffer,
            size,
            usage,
            allocation,
        })
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }

    pub fn device_address(&self) -> vk::DeviceAddress {
        let info = vk::BufferDeviceAddressInfo::builder().buffer(self.buffer);
        unsafe { self.device.get_buffer_device_address(&info) }
    }

    /// Byte pointer into the persistently mapped host-visible memory backing
    /// this buffer, if any (`None` for device-local-only buffers).
    pub fn mapped_ptr(&self) -> Option<*mut u8> {
        self.allocation.cpu_offset
    }

    /// Copy `data` into the buffer's mapped memory. Panics (via slice
    /// bounds) if `data` does not fit; callers are expected to size buffers
    /// up front, matching the teacher's `write_data` idiom.
    pub fn write_data<T: Copy>(&self, data: &[T]) {
        let Some(ptr) = self.mapped_ptr() else {
            panic!("write_data called on a non-host-visible buffer");
        };
        let byte_len = std::mem::size_of_val(data);
        assert!(byte_len as vk::DeviceSize <= self.size, "write exceeds buffer size");
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr().cast::<u8>(), ptr, byte_len);
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_sharing_requires_multiple_families() {
        // Pure logic check, no device needed: mirrors the constructor's rule.
        fn sharing_mode(indices: &[u32]) -> vk::SharingMode {
            if indices.len() > 1 {
                vk::SharingMode::CONCURRENT
            } else {
                vk::SharingMode::EXCLUSIVE
            }
        }
        assert_eq!(sharing_mode(&[0]), vk::SharingMode::EXCLUSIVE);
        assert_eq!(sharing_mode(&[0, 1]), vk::SharingMode::CONCURRENT);
    }
}

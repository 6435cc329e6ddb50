//! A single Vulkan memory object of one memory-property class, suballocated
//! with a [`BuddyAllocator`].

use std::cell::RefCell;
use std::rc::Rc;

use ash::{vk, Device};

use crate::error::{Error, Result, VkResultExt};

use super::buddy::BuddyAllocator;

/// Which side of the host/device split a pool serves. Mirrors the spec's
/// "two vectors of pools (CPU, GPU)".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolClass {
    /// `HOST_COHERENT` (optionally `HOST_VISIBLE`) memory, persistently mapped.
    Cpu,
    /// `DEVICE_LOCAL` memory, never mapped.
    Gpu,
}

/// Owns one `VkDeviceMemory` object and suballocates it via a buddy
/// allocator. Host-visible pools keep a persistent mapping for the pool's
/// lifetime.
pub struct DeviceMemoryPool {
    device: Device,
    memory: vk::DeviceMemory,
    memory_type_index: u32,
    class: PoolClass,
    size: u64,
    mapped_base: Option<*mut u8>,
    buddy: Rc<RefCell<BuddyAllocator>>,
}

impl DeviceMemoryPool {
    pub(crate) fn new(
        device: Device,
        size: u64,
        memory_type_index: u32,
        class: PoolClass,
        min_block_size: u64,
    ) -> Result<Self> {
        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(size)
            .memory_type_index(memory_type_index);

        let memory = unsafe { device.allocate_memory(&alloc_info, None) }
            .map_err(|code| Error::OutOfDeviceMemory {
                requested: size,
                context: format!("{code:?}"),
            })?;

        let mapped_base = if class == PoolClass::Cpu {
            let ptr = unsafe {
                device.map_memory(memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
            }
            .vk_ctx("mapping host-visible memory pool")?;
            Some(ptr as *mut u8)
        } else {
            None
        };

        log::debug!(
            "allocated {class:?} memory pool: {size} bytes, type index {memory_type_index}"
        );

        Ok(Self {
            device,
            memory,
            memory_type_index,
            class,
            size,
            mapped_base,
            buddy: Rc::new(RefCell::new(BuddyAllocator::new(size, min_block_size))),
        })
    }

    pub fn memory_type_index(&self) -> u32 {
        self.memory_type_index
    }

    pub fn class(&self) -> PoolClass {
        self.class
    }

    pub fn handle(&self) -> vk::DeviceMemory {
        self.memory
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn available_size(&self) -> u64 {
        self.buddy.borrow().available_size()
    }

    /// Try to carve `(size, alignment)` out of this pool. Returns the
    /// GPU-side offset and, for host-visible pools, a pointer to the
    /// matching mapped address.
    pub(crate) fn try_allocate(
        &self,
        size: u64,
        alignment: u64,
    ) -> Option<(u64, Option<*mut u8>, Rc<RefCell<BuddyAllocator>>)> {
        let offset = self.buddy.borrow_mut().allocate(size, alignment)?;
        let cpu_ptr = self.mapped_base.map(|base| unsafe { base.add(offset as usize) });
        Some((offset, cpu_ptr, self.buddy.clone()))
    }
}

impl Drop for DeviceMemoryPool {
    fn drop(&mut self) {
        unsafe {
            if self.mapped_base.is_some() {
                self.device.unmap_memory(self.memory);
            }
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_class_equality() {
        assert_eq!(PoolClass::Cpu, PoolClass::Cpu);
        assert_ne!(PoolClass::Cpu, PoolClass::Gpu);
    }
}

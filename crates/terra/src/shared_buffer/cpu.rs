//! Host-visible shared buffer: grows by memcpy'ing previous contents into
//! the new resource directly, with no GPU copy or staging required
//! (spec §4.3).

use ash::vk;

use crate::error::Result;
use crate::memory::MemoryManager;
use crate::resources::Buffer;

use super::free_list::FreeListAllocator;
use super::gpu::SharedBufferData;

/// A host-visible, host-coherent buffer multiplexed between many logical
/// sub-regions. Growth copies the previous contents in directly since both
/// resources are CPU-mapped; no temporary data buffer or transfer
/// submission is involved.
pub struct SharedBufferCpu {
    buffer: Buffer,
    usage: vk::BufferUsageFlags,
    free_list: FreeListAllocator,
}

impl SharedBufferCpu {
    pub fn new(
        device: ash::Device,
        memory: &mut MemoryManager,
        initial_size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> Result<Self> {
        let buffer = Buffer::new(
            device,
            memory,
            initial_size,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            &[],
        )?;
        Ok(Self {
            buffer,
            usage,
            free_list: FreeListAllocator::new(initial_size),
        })
    }

    pub fn capacity(&self) -> u64 {
        self.free_list.capacity()
    }

    pub fn allocate(&mut self, device: &ash::Device, memory: &mut MemoryManager, size: u64) -> Result<u64> {
        if let Some(offset) = self.free_list.allocate(size) {
            return Ok(offset);
        }

        let old_size = self.capacity();
        let new_size = old_size + size;
        let new_buffer = Buffer::new(
            device.clone(),
            memory,
            new_size,
            self.usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            &[],
        )?;

        if let (Some(old_ptr), Some(new_ptr)) = (self.buffer.mapped_ptr(), new_buffer.mapped_ptr()) {
            unsafe {
                std::ptr::copy_nonoverlapping(old_ptr, new_ptr, old_size as usize);
            }
        }

        self.buffer = new_buffer;
        self.free_list = FreeListAllocator::new(new_size);
        Ok(self.free_list.allocate(size).expect("freshly grown buffer must fit"))
    }

    pub fn deallocate(&mut self, offset: u64, size: u64) {
        self.free_list.deallocate(offset, size);
    }

    pub fn write_at<T: Copy>(&self, offset: u64, data: &[T]) {
        let Some(base) = self.buffer.mapped_ptr() else {
            panic!("SharedBufferCpu must be backed by host-visible memory");
        };
        let byte_len = std::mem::size_of_val(data);
        unsafe {
            let dst = base.add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr().cast::<u8>(), dst, byte_len);
        }
    }

    pub fn snapshot(&self, offset: u64, size: u64) -> SharedBufferData {
        SharedBufferData {
            buffer: self.buffer.handle(),
            device_address: self.buffer.device_address(),
            offset,
            size,
        }
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }
}

//! GPU-resident shared buffer: many logical sub-allocations multiplexed
//! into one `VkBuffer`, relocated wholesale on growth (spec §4.3).

use ash::vk;

use crate::error::Result;
use crate::memory::MemoryManager;
use crate::resources::Buffer;
use crate::staging::TemporaryDataBuffer;
use crate::sync::CommandBuffer;

use super::free_list::FreeListAllocator;

/// A read-only snapshot of where a sub-allocation currently lives. Only
/// valid until the next growth call on the owning [`SharedBufferGpu`]
/// returns — callers that cache one across a growth point will read stale
/// data (spec §4.3's ownership note).
#[derive(Clone, Copy)]
pub struct SharedBufferData {
    pub buffer: vk::Buffer,
    pub device_address: vk::DeviceAddress,
    pub offset: u64,
    pub size: u64,
}

/// Holds the previous resource across a frame boundary until
/// `copy_old_buffer` has recorded the full-buffer copy into the new one.
struct PendingCopy {
    old_buffer: vk::Buffer,
    old_size: vk::DeviceSize,
}

/// A device-local buffer multiplexed between many logical sub-regions via
/// a [`FreeListAllocator`]. Growing allocates a fresh, larger `Buffer`,
/// keeps the old one alive in the temporary data buffer, and records a
/// full-buffer copy the next time `copy_old_buffer` runs.
pub struct SharedBufferGpu {
    buffer: Buffer,
    usage: vk::BufferUsageFlags,
    free_list: FreeListAllocator,
    pending_copy: Option<PendingCopy>,
}

impl SharedBufferGpu {
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
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            &[],
        )?;
        Ok(Self {
            buffer,
            usage,
            free_list: FreeListAllocator::new(initial_size),
            pending_copy: None,
        })
    }

    pub fn capacity(&self) -> u64 {
        self.free_list.capacity()
    }

    /// Allocate `size` bytes, growing the backing resource if the free list
    /// has no region large enough. Growth per spec §4.3: the *first* growth
    /// since the last `copy_old_buffer` preserves the displaced resource for
    /// the pending copy; later growths in the same window simply drop their
    /// intermediate resource since no GPU data has been written into it yet.
    pub fn allocate(
        &mut self,
        device: &ash::Device,
        memory: &mut MemoryManager,
        temp_data: &mut TemporaryDataBuffer,
        size: u64,
    ) -> Result<u64> {
        if let Some(offset) = self.free_list.allocate(size) {
            return Ok(offset);
        }

        let old_size = self.capacity();
        let new_size = old_size + size;
        let mut new_buffer = Buffer::new(
            device.clone(),
            memory,
            new_size,
            self.usage,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            &[],
        )?;
        std::mem::swap(&mut self.buffer, &mut new_buffer);
        let old_buffer = new_buffer;

        if self.pending_copy.is_none() {
            self.pending_copy = Some(PendingCopy {
                old_buffer: old_buffer.handle(),
                old_size,
            });
            temp_data.keep_alive(old_buffer);
        }
        // A later growth in the same window: the intermediate resource
        // never received any writes, so `old_buffer` is simply dropped here.

        // Grow in place rather than resetting to a fully-free list: the
        // relocated `[0, old_size)` range is still live (it's what
        // `copy_old_buffer` is about to copy forward), so only the newly
        // added `[old_size, new_size)` range may be handed out.
        self.free_list.grow_by(size);
        Ok(self.free_list.allocate(size).expect("freshly grown buffer must fit"))
    }

    pub fn deallocate(&mut self, offset: u64, size: u64) {
        self.free_list.deallocate(offset, size);
    }

    /// Record the full-buffer copy from the displaced resource into the
    /// current one, if a growth happened since the last call. Must be
    /// recorded on the transfer command buffer before any reads of the new
    /// buffer's relocated contents.
    pub fn copy_old_buffer(&mut self, cmd: &CommandBuffer) {
        let Some(pending) = self.pending_copy.take() else { return };
        cmd.copy_buffer(
            pending.old_buffer,
            self.buffer.handle(),
            vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size: pending.old_size,
            },
        );
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deallocate_then_allocate_reuses_space_without_growth() {
        let mut fl = FreeListAllocator::new(100);
        let a = fl.allocate(50).unwrap();
        fl.deallocate(a, 50);
        assert_eq!(fl.allocate(50), Some(a));
    }
}

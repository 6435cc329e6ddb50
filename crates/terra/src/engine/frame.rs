//! Frame record (spec §3): everything one frame-in-flight slot owns —
//! command buffers, synchronization primitives, descriptor buffer, and the
//! keep-alive temporary data buffer.

use crate::descriptor::DescriptorBuffer;
use crate::error::Result;
use crate::staging::TemporaryDataBuffer;
use crate::sync::{BinarySemaphore, Fence, TimelineSemaphore};

pub struct FrameRecord {
    pub slot_index: usize,
    pub image_acquired_semaphore: BinarySemaphore,
    pub present_semaphore: BinarySemaphore,
    pub transfer_timeline: TimelineSemaphore,
    pub compute_timeline: Option<TimelineSemaphore>,
    pub graphics_fence: Fence,
    pub descriptor_buffer: DescriptorBuffer,
    pub temp_data: TemporaryDataBuffer,
    pub last_transfer_value: u64,
    pub last_compute_value: u64,
}

impl FrameRecord {
    pub fn new(
        device: ash::Device,
        slot_index: usize,
        descriptor_buffer: DescriptorBuffer,
        needs_compute_timeline: bool,
    ) -> Result<Self> {
        Ok(Self {
            slot_index,
            image_acquired_semaphore: BinarySemaphore::new(device.clone())?,
            present_semaphore: BinarySemaphore::new(device.clone())?,
            transfer_timeline: TimelineSemaphore::new(device.clone(), 0)?,
            compute_timeline: needs_compute_timeline
                .then(|| TimelineSemaphore::new(device.clone(), 0))
                .transpose()?,
            graphics_fence: Fence::new(device, true)?,
            descriptor_buffer,
            temp_data: TemporaryDataBuffer::new(),
            last_transfer_value: 0,
            last_compute_value: 0,
        })
    }

    /// Wait on this slot's graphics fence from `F` frames ago, then release
    /// anything its temporary data buffer was keeping alive (spec §5's
    /// "fence.wait() between frames" suspension point).
    pub fn begin_reuse(&mut self) -> Result<()> {
        self.graphics_fence.wait()?;
        self.graphics_fence.reset()?;
        self.temp_data.clear();
        Ok(())
    }
}

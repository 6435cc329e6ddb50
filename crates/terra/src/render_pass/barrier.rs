//! Fixed-capacity group of image barriers recorded as a single dependency
//! (spec §4.8's "start barriers").

use ash::vk;

use crate::error::{Error, Result};

/// Accumulates `VkImageMemoryBarrier2`s for one `vkCmdPipelineBarrier2`
/// call. Bounded so a render pass can't silently grow an unbounded barrier
/// array frame over frame; exceeding `capacity` is a configuration error.
pub struct ImageBarrierGroup {
    capacity: usize,
    barriers: Vec<vk::ImageMemoryBarrier2>,
}

impl ImageBarrierGroup {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            barriers: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.barriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.barriers.is_empty()
    }

    /// Append a barrier, returning its index, unless it is a no-op (same
    /// layout and access on both sides) in which case `u32::MAX` is
    /// returned and nothing is recorded — matching the spec's
    /// `add_start_image_barrier` contract.
    pub fn add(&mut self, barrier: vk::ImageMemoryBarrier2) -> Result<u32> {
        let is_noop = barrier.old_layout == barrier.new_layout
            && barrier.src_access_mask == barrier.dst_access_mask;
        if is_noop {
            return Ok(u32::MAX);
        }
        if self.barriers.len() >= self.capacity {
            return Err(Error::BarrierOverflow {
                count: self.barriers.len() + 1,
                capacity: self.capacity,
                context: "start barrier group".into(),
            });
        }
        let index = self.barriers.len() as u32;
        self.barriers.push(barrier);
        Ok(index)
    }

    pub fn set_image_view(&mut self, index: u32, image: vk::Image) {
        self.barriers[index as usize].image = image;
    }

    pub fn set_src_stage(&mut self, index: u32, stage: vk::PipelineStageFlags2) {
        self.barriers[index as usize].src_stage_mask = stage;
    }

    pub fn clear(&mut self) {
        self.barriers.clear();
    }

    pub fn as_slice(&self) -> &[vk::ImageMemoryBarrier2] {
        &self.barriers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_barrier_returns_max_index_and_is_not_recorded() {
        let mut group = ImageBarrierGroup::new(4);
        let noop = vk::ImageMemoryBarrier2::builder()
            .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .new_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .src_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
            .dst_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
            .build();
        assert_eq!(group.add(noop).unwrap(), u32::MAX);
        assert!(group.is_empty());
    }

    #[test]
    fn overflow_past_capacity_errors() {
        let mut group = ImageBarrierGroup::new(1);
        let b = vk::ImageMemoryBarrier2::builder()
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .build();
        assert!(group.add(b).is_ok());
        assert!(group.add(b).is_err());
    }
}

//! Staging/upload pipeline: cross-queue ownership transfer and lifetime-
//! tracked temporary CPU/GPU staging buffers (spec §4.4).

use std::collections::HashSet;
use std::rc::Rc;

use ash::{vk, Device};

use crate::error::Result;
use crate::memory::MemoryManager;
use crate::resources::Buffer;
use crate::sync::CommandBuffer;

use super::temporary_data::TemporaryDataBuffer;

/// Identifies the destination resource for deduplicating ownership-transfer
/// barriers ("for the same resource+queue").
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum ResourceRef {
    Buffer(vk::Buffer),
    Image(vk::Image),
}

/// Destination queue family and access/stage the resource will be used with
/// once ownership transfers off the transfer queue.
#[derive(Clone, Copy)]
struct QueueTransfer {
    dst_family: u32,
    dst_access: vk::AccessFlags2,
    dst_stage: vk::PipelineStageFlags2,
}

enum Destination {
    Buffer {
        dst: vk::Buffer,
        offset: vk::DeviceSize,
    },
    Texture {
        dst: vk::Image,
        extent: vk::Extent3D,
        aspect: vk::ImageAspectFlags,
    },
}

struct PendingEntry {
    data: Rc<[u8]>,
    destination: Destination,
    resource: ResourceRef,
    dst_queue: Option<QueueTransfer>,
}

struct ProcessedEntry {
    resource: ResourceRef,
    dst_queue: Option<QueueTransfer>,
}

/// Queues CPU->GPU transfers, lazily creates host-visible staging buffers
/// at flush time, and manages the queue-family release/acquire barrier
/// pairs needed when a resource moves from the transfer queue to its
/// owning queue.
#[derive(Default)]
pub struct StagingBufferManager {
    pending: Vec<PendingEntry>,
    processed: Vec<ProcessedEntry>,
    released: HashSet<(ResourceRef, u32)>,
    acquired: HashSet<(ResourceRef, u32)>,
}

impl StagingBufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a CPU->GPU buffer upload. `data` is retained until the frame
    /// that performs the copy completes.
    pub fn add_buffer(
        &mut self,
        data: &[u8],
        dst_buffer: vk::Buffer,
        offset: vk::DeviceSize,
        dst_queue: Option<(u32, vk::AccessFlags2, vk::PipelineStageFlags2)>,
    ) {
        self.pending.push(PendingEntry {
            data: Rc::from(data),
            destination: Destination::Buffer { dst: dst_buffer, offset },
            resource: ResourceRef::Buffer(dst_buffer),
            dst_queue: dst_queue.map(|(f, a, s)| QueueTransfer {
                dst_family: f,
                dst_access: a,
                dst_stage: s,
            }),
        });
    }

    /// Queue a CPU->GPU texture upload (tightly packed pixel data matching
    /// `extent` and the texture's format).
    pub fn add_texture(
        &mut self,
        data: &[u8],
        dst_image: vk::Image,
        extent: vk::Extent3D,
        aspect: vk::ImageAspectFlags,
        dst_queue: Option<(u32, vk::AccessFlags2, vk::PipelineStageFlags2)>,
    ) {
        self.pending.push(PendingEntry {
            data: Rc::from(data),
            destination: Destination::Texture { dst: dst_image, extent, aspect },
            resource: ResourceRef::Image(dst_image),
            dst_queue: dst_queue.map(|(f, a, s)| QueueTransfer {
                dst_family: f,
                dst_access: a,
                dst_stage: s,
            }),
        });
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drain all queued entries, creating one staging buffer per entry,
    /// recording the copy into `transfer_cmd`, and handing each staging
    /// buffer to `temp_data` to keep alive until the frame's fence signals.
    pub fn copy_and_clear(
        &mut self,
        device: &Device,
        memory: &mut MemoryManager,
        transfer_cmd: &CommandBuffer,
        temp_data: &mut TemporaryDataBuffer,
    ) -> Result<()> {
        self.processed.clear();
        self.released.clear();
        self.acquired.clear();

        for entry in self.pending.drain(..) {
            let staging = Buffer::new(
                device.clone(),
                memory,
                entry.data.len() as vk::DeviceSize,
                vk::BufferUsageFlags::TRANSFER_SRC,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
                &[],
            )?;
            staging.write_data(&entry.data);

            match entry.destination {
                Destination::Buffer { dst, offset } => {
                    transfer_cmd.copy_buffer(
                        staging.handle(),
                        dst,
                        vk::BufferCopy {
                            src_offset: 0,
                            dst_offset: offset,
                            size: entry.data.len() as vk::DeviceSize,
                        },
                    );
                }
                Destination::Texture { dst, extent, aspect } => {
                    let to_transfer_dst = vk::ImageMemoryBarrier2::builder()
                        .src_stage_mask(vk::PipelineStageFlags2::TOP_OF_PIPE)
                        .src_access_mask(vk::AccessFlags2::empty())
                        .dst_stage_mask(vk::PipelineStageFlags2::TRANSFER)
                        .dst_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
                        .old_layout(vk::ImageLayout::UNDEFINED)
                        .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                        .image(dst)
                        .subresource_range(vk::ImageSubresourceRange {
                            aspect_mask: aspect,
                            base_mip_level: 0,
                            level_count: 1,
                            base_array_layer: 0,
                            layer_count: 1,
                        })
                        .build();
                    let dep_info = vk::DependencyInfo::builder()
                        .image_memory_barriers(std::slice::from_ref(&to_transfer_dst));
                    transfer_cmd.pipeline_barrier2(&dep_info);

                    transfer_cmd.copy_buffer_to_image(
                        staging.handle(),
                        dst,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        vk::BufferImageCopy {
                            buffer_offset: 0,
                            buffer_row_length: 0,
                            buffer_image_height: 0,
                            image_subresource: vk::ImageSubresourceLayers {
                                aspect_mask: aspect,
                                mip_level: 0,
                                base_array_layer: 0,
                                layer_count: 1,
                            },
                            image_offset: vk::Offset3D::default(),
                            image_extent: extent,
                        },
                    );
                }
            }

            self.processed.push(ProcessedEntry {
                resource: entry.resource,
                dst_queue: entry.dst_queue,
            });
            temp_data.keep_alive(staging);
        }
        Ok(())
    }

    /// Emit a queue-family release barrier (transfer -> `dst_queue`'s
    /// family) for every entry processed this cycle that requested one.
    /// Skips entries already released for the same resource+queue.
    pub fn release_ownership(&mut self, transfer_cmd: &CommandBuffer, transfer_family: u32) {
        for (entry, qt) in new_transfer_entries(&self.processed, &mut self.released, None) {
            let (image, buffer) = match entry.resource {
                ResourceRef::Image(image) => (Some(image), None),
                ResourceRef::Buffer(buffer) => (None, Some(buffer)),
            };
            if let Some(image) = image {
                let barrier = vk::ImageMemoryBarrier2::builder()
                    .src_stage_mask(vk::PipelineStageFlags2::TRANSFER)
                    .src_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
                    .dst_stage_mask(qt.dst_stage)
                    .dst_access_mask(qt.dst_access)
                    .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                    .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                    .src_queue_family_index(transfer_family)
                    .dst_queue_family_index(qt.dst_family)
                    .image(image)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
                    .build();
                let dep_info =
                    vk::DependencyInfo::builder().image_memory_barriers(std::slice::from_ref(&barrier));
                transfer_cmd.pipeline_barrier2(&dep_info);
            } else if let Some(buffer) = buffer {
                let barrier = vk::BufferMemoryBarrier2::builder()
                    .src_stage_mask(vk::PipelineStageFlags2::TRANSFER)
                    .src_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
                    .dst_stage_mask(qt.dst_stage)
                    .dst_access_mask(qt.dst_access)
                    .src_queue_family_index(transfer_family)
                    .dst_queue_family_index(qt.dst_family)
                    .buffer(buffer)
                    .offset(0)
                    .size(vk::WHOLE_SIZE)
                    .build();
                let dep_info =
                    vk::DependencyInfo::builder().buffer_memory_barriers(std::slice::from_ref(&barrier));
                transfer_cmd.pipeline_barrier2(&dep_info);
            }
        }
    }

    /// Emit the matching acquire barrier on the owning queue's command
    /// buffer for every entry destined for `owner_family`.
    pub fn acquire_ownership(
        &mut self,
        owner_cmd: &CommandBuffer,
        owner_family: u32,
        transfer_family: u32,
    ) {
        for (entry, qt) in new_transfer_entries(&self.processed, &mut self.acquired, Some(owner_family)) {
            match entry.resource {
                ResourceRef::Image(image) => {
                    let barrier = vk::ImageMemoryBarrier2::builder()
                        .src_stage_mask(vk::PipelineStageFlags2::NONE)
                        .src_access_mask(vk::AccessFlags2::empty())
                        .dst_stage_mask(qt.dst_stage)
                        .dst_access_mask(qt.dst_access)
                        .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                        .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                        .src_queue_family_index(transfer_family)
                        .dst_queue_family_index(owner_family)
                        .image(image)
                        .subresource_range(vk::ImageSubresourceRange {
                            aspect_mask: vk::ImageAspectFlags::COLOR,
                            base_mip_level: 0,
                            level_count: 1,
                            base_array_layer: 0,
                            layer_count: 1,
                        })
                        .build();
                    let dep_info = vk::DependencyInfo::builder()
                        .image_memory_barriers(std::slice::from_ref(&barrier));
                    owner_cmd.pipeline_barrier2(&dep_info);
                }
                ResourceRef::Buffer(buffer) => {
                    let barrier = vk::BufferMemoryBarrier2::builder()
                        .src_stage_mask(vk::PipelineStageFlags2::NONE)
                        .src_access_mask(vk::AccessFlags2::empty())
                        .dst_stage_mask(qt.dst_stage)
                        .dst_access_mask(qt.dst_access)
                        .src_queue_family_index(transfer_family)
                        .dst_queue_family_index(owner_family)
                        .buffer(buffer)
                        .offset(0)
                        .size(vk::WHOLE_SIZE)
                        .build();
                    let dep_info = vk::DependencyInfo::builder()
                        .buffer_memory_barriers(std::slice::from_ref(&barrier));
                    owner_cmd.pipeline_barrier2(&dep_info);
                }
            }
        }
    }
}

/// Entries from `processed` that request a queue-family transfer and
/// haven't already been recorded in `seen` for their `(resource, dst_family)`
/// pair, newly marking each one as seen. `owner_family`, when set, further
/// restricts to entries destined for that family (used by
/// `acquire_ownership`; `release_ownership` passes `None` to consider all of
/// them). Shared so `release_ownership`/`acquire_ownership` can't drift from
/// each other's dedup rule.
fn new_transfer_entries<'a>(
    processed: &'a [ProcessedEntry],
    seen: &mut HashSet<(ResourceRef, u32)>,
    owner_family: Option<u32>,
) -> Vec<(&'a ProcessedEntry, QueueTransfer)> {
    let mut out = Vec::new();
    for entry in processed {
        let Some(qt) = entry.dst_queue else { continue };
        if owner_family.is_some_and(|f| qt.dst_family != f) {
            continue;
        }
        if seen.insert((entry.resource, qt.dst_family)) {
            out.push((entry, qt));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_tracks_resource_and_queue_pair() {
        let mut mgr = StagingBufferManager::new();
        let buf = vk::Buffer::from_raw(0xdead_beef);
        mgr.processed.push(ProcessedEntry {
            resource: ResourceRef::Buffer(buf),
            dst_queue: Some(QueueTransfer {
                dst_family: 1,
                dst_access: vk::AccessFlags2::SHADER_READ,
                dst_stage: vk::PipelineStageFlags2::VERTEX_SHADER,
            }),
        });
        assert!(mgr.released.insert((ResourceRef::Buffer(buf), 1)));
        assert!(!mgr.released.insert((ResourceRef::Buffer(buf), 1)));
    }

    #[test]
    fn boundary_scenario_3_staging_and_ownership() {
        let mut mgr = StagingBufferManager::new();
        let buf = vk::Buffer::from_raw(1);
        let image = vk::Image::from_raw(2);
        let graphics_family = 0u32;

        mgr.processed.push(ProcessedEntry {
            resource: ResourceRef::Buffer(buf),
            dst_queue: Some(QueueTransfer {
                dst_family: graphics_family,
                dst_access: vk::AccessFlags2::SHADER_READ,
                dst_stage: vk::PipelineStageFlags2::VERTEX_SHADER,
            }),
        });
        mgr.processed.push(ProcessedEntry {
            resource: ResourceRef::Image(image),
            dst_queue: Some(QueueTransfer {
                dst_family: graphics_family,
                dst_access: vk::AccessFlags2::SHADER_READ,
                dst_stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
            }),
        });

        // Drive the exact dedup function `release_ownership`/
        // `acquire_ownership` call — not a hand-reproduced `HashSet` — since
        // both methods otherwise require a real command buffer to exercise.
        let released = new_transfer_entries(&mgr.processed, &mut mgr.released, None);
        assert_eq!(released.len(), 2);
        let released_again = new_transfer_entries(&mgr.processed, &mut mgr.released, None);
        assert!(released_again.is_empty(), "already-released pairs must not repeat");

        let acquired = new_transfer_entries(&mgr.processed, &mut mgr.acquired, Some(graphics_family));
        assert_eq!(acquired.len(), 2);
        let wrong_family = new_transfer_entries(&mgr.processed, &mut HashSet::new(), Some(graphics_family + 1));
        assert!(wrong_family.is_empty(), "entries destined for another family are filtered out");

        assert_eq!(mgr.released.len(), 2);
        assert_eq!(mgr.acquired.len(), 2);
        assert!(mgr.released.contains(&(ResourceRef::Buffer(buf), graphics_family)));
        assert!(mgr.released.contains(&(ResourceRef::Image(image), graphics_family)));
    }
}

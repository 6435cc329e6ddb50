//! Application-facing operations over the external resource factory
//! (spec §4.10): uploads routed through staging, deferred GPU-to-GPU
//! copies, and descriptor writes at the external binding set.

use ash::vk;

use crate::descriptor::DescriptorBuffer;
use crate::staging::StagingBufferManager;
use crate::sync::CommandBuffer;

use super::factory::VkExternalResourceFactory;

/// Binding details for `update_descriptor`: which descriptor set/slot the
/// external resource is written to, and its descriptor type.
pub struct ExternalBindingDetails {
    pub set: usize,
    pub slot: u32,
    pub descriptor_type: vk::DescriptorType,
}

struct PendingGpuCopy {
    src_index: u32,
    dst_index: u32,
    src_offset: vk::DeviceSize,
    dst_offset: vk::DeviceSize,
    size: vk::DeviceSize,
}

/// Orchestrates uploads and GPU-to-GPU copies against a
/// [`VkExternalResourceFactory`]'s buffers, and writes their descriptors.
#[derive(Default)]
pub struct VkExternalResourceManager {
    pending_copies: Vec<PendingGpuCopy>,
}

impl VkExternalResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `cpu_data` for upload into a `GpuOnly` external buffer via the
    /// staging pipeline.
    pub fn upload_external_buffer_gpu_only_data(
        &self,
        staging: &mut StagingBufferManager,
        factory: &VkExternalResourceFactory,
        index: u32,
        cpu_data: &[u8],
        dst_offset: vk::DeviceSize,
    ) {
        let dst_buffer = factory.buffer(index).handle();
        staging.add_buffer(cpu_data, dst_buffer, dst_offset, None);
    }

    /// Queue a GPU-to-GPU copy, recorded on the next transfer submission.
    pub fn queue_external_buffer_gpu_copy(
        &mut self,
        src_index: u32,
        dst_index: u32,
        dst_offset: vk::DeviceSize,
        src_offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) {
        self.pending_copies.push(PendingGpuCopy {
            src_index,
            dst_index,
            src_offset,
            dst_offset,
            size,
        });
    }

    /// Record every queued GPU-to-GPU copy onto the transfer command
    /// buffer and clear the queue.
    pub fn flush_gpu_copies(&mut self, transfer_cmd: &CommandBuffer, factory: &VkExternalResourceFactory) {
        for copy in self.pending_copies.drain(..) {
            let src = factory.buffer(copy.src_index).handle();
            let dst = factory.buffer(copy.dst_index).handle();
            transfer_cmd.copy_buffer(
                src,
                dst,
                vk::BufferCopy {
                    src_offset: copy.src_offset,
                    dst_offset: copy.dst_offset,
                    size: copy.size,
                },
            );
        }
    }

    /// Write a UBO or SSBO descriptor for an external buffer at its
    /// configured binding.
    pub fn update_descriptor(
        &self,
        descriptors: &DescriptorBuffer,
        factory: &VkExternalResourceFactory,
        buffer_index: u32,
        binding: &ExternalBindingDetails,
        range: vk::DeviceSize,
    ) {
        let buffer = factory.buffer(buffer_index);
        let address = buffer.device_address();
        match binding.descriptor_type {
            vk::DescriptorType::UNIFORM_BUFFER => {
                descriptors.set_uniform_buffer_descriptor(binding.set, binding.slot, 0, address, range);
            }
            vk::DescriptorType::STORAGE_BUFFER => {
                descriptors.set_storage_buffer_descriptor(binding.set, binding.slot, 0, address, range);
            }
            other => panic!("external buffer descriptor type not supported: {other:?}"),
        }
    }
}

//! `MeshManagerVSIndividual` (spec §4.9): one shared vertex buffer and one
//! shared 32-bit index buffer, drawn with `vkCmdDrawIndexed` per model.

use ash::vk;

use crate::error::Result;
use crate::foundation::Aabb;
use crate::handles::MeshBundleKey;
use crate::memory::MemoryManager;
use crate::shared_buffer::SharedBufferGpu;
use crate::staging::{StagingBufferManager, TemporaryDataBuffer};

use super::bundle::{VsMeshBundle, VsMeshBundleContainer};

pub struct MeshManagerVsIndividual {
    vertices: SharedBufferGpu,
    indices: SharedBufferGpu,
    vertex_stride: u64,
    bundles: VsMeshBundleContainer,
}

impl MeshManagerVsIndividual {
    pub fn new(device: ash::Device, memory: &mut MemoryManager, vertex_stride: u64, initial_size: u64) -> Result<Self> {
        let vertices = SharedBufferGpu::new(
            device.clone(),
            memory,
            initial_size,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
        )?;
        let indices = SharedBufferGpu::new(
            device,
            memory,
            initial_size,
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
        )?;
        Ok(Self {
            vertices,
            indices,
            vertex_stride,
            bundles: VsMeshBundleContainer::new(),
        })
    }

    /// Upload one mesh's vertex/index data, returning a stable handle.
    pub fn upload_mesh(
        &mut self,
        device: &ash::Device,
        memory: &mut MemoryManager,
        temp_data: &mut TemporaryDataBuffer,
        staging: &mut StagingBufferManager,
        vertex_bytes: &[u8],
        indices: &[u32],
        aabb: Aabb,
    ) -> Result<MeshBundleKey> {
        let vertex_offset_bytes =
            self.vertices.allocate(device, memory, temp_data, vertex_bytes.len() as u64)?;
        let index_bytes = std::mem::size_of_val(indices) as u64;
        let index_offset_bytes = self.indices.allocate(device, memory, temp_data, index_bytes)?;

        staging.add_buffer(vertex_bytes, self.vertices.handle(), vertex_offset_bytes, None);
        let index_u8 = bytemuck::cast_slice(indices);
        staging.add_buffer(index_u8, self.indices.handle(), index_offset_bytes, None);

        let key = self.bundles.insert(VsMeshBundle {
            vertex_offset: (vertex_offset_bytes / self.vertex_stride) as i32,
            first_index: (index_offset_bytes / std::mem::size_of::<u32>() as u64) as u32,
            index_count: indices.len() as u32,
            aabb,
        });
        Ok(key)
    }

    pub fn bundle(&self, key: MeshBundleKey) -> Option<&VsMeshBundle> {
        self.bundles.get(key)
    }

    pub fn vertex_buffer(&self) -> vk::Buffer {
        self.vertices.handle()
    }

    pub fn index_buffer(&self) -> vk::Buffer {
        self.indices.handle()
    }

    pub fn copy_old_buffers(&mut self, cmd: &crate::sync::CommandBuffer) {
        self.vertices.copy_old_buffer(cmd);
        self.indices.copy_old_buffer(cmd);
    }
}

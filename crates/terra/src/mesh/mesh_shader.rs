//! `MeshManagerMS` (spec §4.9): four shared buffers (vertices,
//! vertex-indices, primitive-indices, meshlet descriptors), drawn with
//! `vkCmdDrawMeshTasksEXT` per model bundle.

use ash::vk;

use crate::error::Result;
use crate::foundation::Aabb;
use crate::handles::MeshBundleKey;
use crate::memory::MemoryManager;
use crate::shared_buffer::SharedBufferGpu;
use crate::staging::{StagingBufferManager, TemporaryDataBuffer};

use super::bundle::{MsMeshBundle, MsMeshBundleContainer};

/// Byte offsets a newly uploaded mesh lands at inside each of the four
/// shared buffers — callers write the meshlet-descriptor entries
/// referencing these offsets before uploading the descriptor bytes.
pub struct MeshUploadOffsets {
    pub vertex_offset: u64,
    pub vertex_index_offset: u64,
    pub primitive_index_offset: u64,
    pub meshlet_descriptor_offset: u64,
}

pub struct MeshManagerMs {
    vertices: SharedBufferGpu,
    vertex_indices: SharedBufferGpu,
    primitive_indices: SharedBufferGpu,
    meshlet_descriptors: SharedBufferGpu,
    meshlet_descriptor_stride: u64,
    bundles: MsMeshBundleContainer,
}

impl MeshManagerMs {
    pub fn new(
        device: ash::Device,
        memory: &mut MemoryManager,
        meshlet_descriptor_stride: u64,
        initial_size: u64,
    ) -> Result<Self> {
        let usage = vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::TRANSFER_DST;
        Ok(Self {
            vertices: SharedBufferGpu::new(device.clone(), memory, initial_size, usage)?,
            vertex_indices: SharedBufferGpu::new(device.clone(), memory, initial_size, usage)?,
            primitive_indices: SharedBufferGpu::new(device.clone(), memory, initial_size, usage)?,
            meshlet_descriptors: SharedBufferGpu::new(device, memory, initial_size, usage)?,
            meshlet_descriptor_stride,
            bundles: MsMeshBundleContainer::new(),
        })
    }

    /// Reserve space for a mesh's four data streams, returning the byte
    /// offsets the caller should upload into via `staging`.
    #[allow(clippy::too_many_arguments)]
    pub fn reserve_mesh(
        &mut self,
        device: &ash::Device,
        memory: &mut MemoryManager,
        temp_data: &mut TemporaryDataBuffer,
        vertex_bytes: u64,
        vertex_index_bytes: u64,
        primitive_index_bytes: u64,
        meshlet_count: u32,
        aabb: Aabb,
    ) -> Result<(MeshBundleKey, MeshUploadOffsets)> {
        let vertex_offset = self.vertices.allocate(device, memory, temp_data, vertex_bytes)?;
        let vertex_index_offset = self.vertex_indices.allocate(device, memory, temp_data, vertex_index_bytes)?;
        let primitive_index_offset =
            self.primitive_indices.allocate(device, memory, temp_data, primitive_index_bytes)?;
        let descriptor_bytes = u64::from(meshlet_count) * self.meshlet_descriptor_stride;
        let meshlet_descriptor_offset =
            self.meshlet_descriptors.allocate(device, memory, temp_data, descriptor_bytes)?;

        let meshlet_offset = (meshlet_descriptor_offset / self.meshlet_descriptor_stride) as u32;
        let key = self.bundles.insert(MsMeshBundle {
            meshlet_offset,
            meshlet_count,
            aabb,
        });

        Ok((
            key,
            MeshUploadOffsets {
                vertex_offset,
                vertex_index_offset,
                primitive_index_offset,
                meshlet_descriptor_offset,
            },
        ))
    }

    pub fn upload_bytes(
        &self,
        staging: &mut StagingBufferManager,
        offsets: &MeshUploadOffsets,
        vertices: &[u8],
        vertex_indices: &[u8],
        primitive_indices: &[u8],
        meshlet_descriptors: &[u8],
    ) {
        staging.add_buffer(vertices, self.vertices.handle(), offsets.vertex_offset, None);
        staging.add_buffer(vertex_indices, self.vertex_indices.handle(), offsets.vertex_index_offset, None);
        staging.add_buffer(
            primitive_indices,
            self.primitive_indices.handle(),
            offsets.primitive_index_offset,
            None,
        );
        staging.add_buffer(
            meshlet_descriptors,
            self.meshlet_descriptors.handle(),
            offsets.meshlet_descriptor_offset,
            None,
        );
    }

    pub fn bundle(&self, key: MeshBundleKey) -> Option<&MsMeshBundle> {
        self.bundles.get(key)
    }

    pub fn copy_old_buffers(&mut self, cmd: &crate::sync::CommandBuffer) {
        self.vertices.copy_old_buffer(cmd);
        self.vertex_indices.copy_old_buffer(cmd);
        self.primitive_indices.copy_old_buffer(cmd);
        self.meshlet_descriptors.copy_old_buffer(cmd);
    }
}

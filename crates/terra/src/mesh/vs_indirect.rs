//! `MeshManagerVSIndirect` (spec §4.9): the VS-individual layout plus a
//! shared buffer of per-mesh AABBs consumed by the frustum-culling compute
//! pass.

use ash::vk;
use bytemuck::{Pod, Zeroable};

use crate::error::Result;
use crate::foundation::Aabb;
use crate::handles::MeshBundleKey;
use crate::memory::MemoryManager;
use crate::shared_buffer::{SharedBufferData, SharedBufferGpu};
use crate::staging::{StagingBufferManager, TemporaryDataBuffer};

use super::bundle::{VsMeshBundle, VsMeshBundleContainer};

/// GLSL-compatible `std430` layout for one mesh's AABB: two `vec4`s so the
/// struct stride is 32 bytes with no implicit padding surprises.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct GpuAabb {
    pub min: [f32; 4],
    pub max: [f32; 4],
}

impl From<Aabb> for GpuAabb {
    fn from(aabb: Aabb) -> Self {
        Self {
            min: [aabb.min.x, aabb.min.y, aabb.min.z, 0.0],
            max: [aabb.max.x, aabb.max.y, aabb.max.z, 0.0],
        }
    }
}

pub struct MeshManagerVsIndirect {
    vertices: SharedBufferGpu,
    indices: SharedBufferGpu,
    aabbs: SharedBufferGpu,
    vertex_stride: u64,
    bundles: VsMeshBundleContainer,
    /// Index (into the AABB buffer, in `GpuAabb` units) per mesh, parallel
    /// to insertion order — the compute shader's per-mesh input array.
    aabb_slots: Vec<(MeshBundleKey, u32)>,
}

impl MeshManagerVsIndirect {
    pub fn new(device: ash::Device, memory: &mut MemoryManager, vertex_stride: u64, initial_size: u64) -> Result<Self> {
        let vertices = SharedBufferGpu::new(
            device.clone(),
            memory,
            initial_size,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
        )?;
        let indices = SharedBufferGpu::new(
            device.clone(),
            memory,
            initial_size,
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
        )?;
        let aabbs = SharedBufferGpu::new(
            device,
            memory,
            initial_size,
            vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
        )?;
        Ok(Self {
            vertices,
            indices,
            aabbs,
            vertex_stride,
            bundles: VsMeshBundleContainer::new(),
            aabb_slots: Vec::new(),
        })
    }

    #[allow(clippy::too_many_arguments)]
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
        let gpu_aabb = GpuAabb::from(aabb);
        let aabb_size = std::mem::size_of::<GpuAabb>() as u64;
        let aabb_offset_bytes = self.aabbs.allocate(device, memory, temp_data, aabb_size)?;

        staging.add_buffer(vertex_bytes, self.vertices.handle(), vertex_offset_bytes, None);
        staging.add_buffer(bytemuck::cast_slice(indices), self.indices.handle(), index_offset_bytes, None);
        staging.add_buffer(
            bytemuck::bytes_of(&gpu_aabb),
            self.aabbs.handle(),
            aabb_offset_bytes,
            None,
        );

        let key = self.bundles.insert(VsMeshBundle {
            vertex_offset: (vertex_offset_bytes / self.vertex_stride) as i32,
            first_index: (index_offset_bytes / std::mem::size_of::<u32>() as u64) as u32,
            index_count: indices.len() as u32,
            aabb,
        });
        self.aabb_slots.push((key, (aabb_offset_bytes / aabb_size) as u32));
        Ok(key)
    }

    pub fn bundle(&self, key: MeshBundleKey) -> Option<&VsMeshBundle> {
        self.bundles.get(key)
    }

    pub fn aabb_slot(&self, key: MeshBundleKey) -> Option<u32> {
        self.aabb_slots.iter().find(|(k, _)| *k == key).map(|(_, slot)| *slot)
    }

    pub fn vertex_buffer(&self) -> vk::Buffer {
        self.vertices.handle()
    }

    pub fn index_buffer(&self) -> vk::Buffer {
        self.indices.handle()
    }

    pub fn aabb_buffer(&self) -> vk::Buffer {
        self.aabbs.handle()
    }

    /// Whole-buffer device address/range, for binding the per-mesh AABB
    /// array into the culling compute pass's descriptor buffer.
    pub fn aabb_buffer_snapshot(&self) -> SharedBufferData {
        self.aabbs.snapshot(0, self.aabbs.capacity())
    }

    pub fn copy_old_buffers(&mut self, cmd: &crate::sync::CommandBuffer) {
        self.vertices.copy_old_buffer(cmd);
        self.indices.copy_old_buffer(cmd);
        self.aabbs.copy_old_buffer(cmd);
    }
}

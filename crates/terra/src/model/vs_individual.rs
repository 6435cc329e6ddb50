//! `ModelManagerVSIndividual` (spec §4.9): one `vkCmdDrawIndexed` per model,
//! sourced from an upload-streamed per-frame instance-data block.

use ash::vk;

use crate::error::Result;
use crate::foundation::math::Mat4;
use crate::memory::MemoryManager;
use crate::mesh::MeshManagerVsIndividual;
use crate::shared_buffer::SharedBufferCpu;
use crate::sync::CommandBuffer;

use super::bundle::ModelBundleContainer;
use super::container::ModelContainer;

/// Per-model data written into the instance block each frame; matches the
/// layout the vertex shader reads via the model-data storage buffer.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuModelData {
    pub model_matrix: [[f32; 4]; 4],
}

pub struct ModelManagerVsIndividual {
    instance_data: SharedBufferCpu,
    instance_offset: u64,
    instance_capacity: usize,
}

impl ModelManagerVsIndividual {
    pub fn new(device: ash::Device, memory: &mut MemoryManager, instance_capacity: usize) -> Result<Self> {
        let stride = std::mem::size_of::<GpuModelData>() as u64;
        let instance_data = SharedBufferCpu::new(
            device,
            memory,
            stride * instance_capacity as u64,
            vk::BufferUsageFlags::STORAGE_BUFFER,
        )?;
        Ok(Self {
            instance_data,
            instance_offset: 0,
            instance_capacity,
        })
    }

    pub fn instance_buffer(&self) -> vk::Buffer {
        self.instance_data.handle()
    }

    pub fn instance_capacity(&self) -> usize {
        self.instance_capacity
    }

    /// Recompute the per-frame instance block from the model container's
    /// current transforms, in bundle-local-index order.
    pub fn update_frame_data(&mut self, bundles: &ModelBundleContainer, models: &ModelContainer, bundle_key: crate::handles::ModelBundleKey) {
        let Some(bundle) = bundles.get(bundle_key) else { return };
        let data: Vec<GpuModelData> = bundle
            .models()
            .iter()
            .filter_map(|&key| models.get(key))
            .map(|m| GpuModelData {
                model_matrix: model_matrix_columns(m.transform.to_matrix()),
            })
            .collect();
        self.instance_data.write_at(self.instance_offset, &data);
    }

    /// Record one `vkCmdDrawIndexed` per visible model in `bundle`, bound
    /// against `mesh_manager`'s shared vertex/index buffers.
    pub fn draw(
        &self,
        cmd: &CommandBuffer,
        mesh_manager: &MeshManagerVsIndividual,
        bundles: &ModelBundleContainer,
        models: &ModelContainer,
        bundle_key: crate::handles::ModelBundleKey,
    ) {
        let Some(bundle) = bundles.get(bundle_key) else { return };
        cmd.bind_vertex_buffers(0, &[mesh_manager.vertex_buffer()], &[0]);
        cmd.bind_index_buffer(mesh_manager.index_buffer(), 0, vk::IndexType::UINT32);

        for (instance_index, &key) in bundle.models().iter().enumerate() {
            let Some(model) = models.get(key) else { continue };
            if !model.visible {
                continue;
            }
            let Some(mesh) = mesh_manager.bundle(model.mesh_bundle) else { continue };
            cmd.draw_indexed(
                mesh.index_count,
                1,
                mesh.first_index,
                mesh.vertex_offset,
                instance_index as u32,
            );
        }
    }
}

pub(crate) fn model_matrix_columns(m: Mat4) -> [[f32; 4]; 4] {
    let mut out = [[0.0f32; 4]; 4];
    for (col, slot) in m.column_iter().zip(out.iter_mut()) {
        *slot = [col[0], col[1], col[2], col[3]];
    }
    out
}

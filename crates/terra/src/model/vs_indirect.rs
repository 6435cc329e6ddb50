//! `ModelManagerVSIndirect` (spec §4.9): adds a GPU frustum-culling compute
//! pass that fills an indirect-draw argument buffer, drawn with
//! `vkCmdDrawIndexedIndirectCount`.

use ash::vk;

use crate::error::Result;
use crate::memory::MemoryManager;
use crate::mesh::MeshManagerVsIndirect;
use crate::shared_buffer::{SharedBufferCpu, SharedBufferData};
use crate::sync::CommandBuffer;

use super::bundle::ModelBundleContainer;
use super::container::ModelContainer;
use super::vs_individual::{model_matrix_columns, GpuModelData};

/// Matches `VkDrawIndexedIndirectCommand`'s byte layout exactly, so the
/// argument buffer can be bound straight into `vkCmdDrawIndexedIndirectCount`.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuDrawIndexedIndirectCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

const WORKGROUP_SIZE: u32 = 64;

pub struct ModelManagerVsIndirect {
    model_data: SharedBufferCpu,
    argument_buffer: SharedBufferCpu,
    counter_buffer: SharedBufferCpu,
    max_models: usize,
}

impl ModelManagerVsIndirect {
    pub fn new(device: ash::Device, memory: &mut MemoryManager, max_models: usize) -> Result<Self> {
        let model_stride = std::mem::size_of::<GpuModelData>() as u64;
        let model_data = SharedBufferCpu::new(
            device.clone(),
            memory,
            model_stride * max_models as u64,
            vk::BufferUsageFlags::STORAGE_BUFFER,
        )?;
        let argument_stride = std::mem::size_of::<GpuDrawIndexedIndirectCommand>() as u64;
        let argument_buffer = SharedBufferCpu::new(
            device.clone(),
            memory,
            argument_stride * max_models as u64,
            vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::INDIRECT_BUFFER,
        )?;
        // `u32 count, u32 pad` per spec.
        let counter_buffer = SharedBufferCpu::new(
            device,
            memory,
            8,
            vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::INDIRECT_BUFFER,
        )?;
        Ok(Self {
            model_data,
            argument_buffer,
            counter_buffer,
            max_models,
        })
    }

    pub fn model_data_buffer(&self) -> vk::Buffer {
        self.model_data.handle()
    }

    pub fn argument_buffer(&self) -> vk::Buffer {
        self.argument_buffer.handle()
    }

    pub fn counter_buffer(&self) -> vk::Buffer {
        self.counter_buffer.handle()
    }

    pub fn max_models(&self) -> usize {
        self.max_models
    }

    /// Whole-buffer device address/range snapshots, for binding the cull
    /// compute pass's per-model-data/argument/counter inputs and outputs.
    pub fn model_data_snapshot(&self) -> SharedBufferData {
        self.model_data.snapshot(0, self.model_data.capacity())
    }

    pub fn argument_buffer_snapshot(&self) -> SharedBufferData {
        self.argument_buffer.snapshot(0, self.argument_buffer.capacity())
    }

    pub fn counter_buffer_snapshot(&self) -> SharedBufferData {
        self.counter_buffer.snapshot(0, self.counter_buffer.capacity())
    }

    pub fn update_frame_data(
        &mut self,
        bundles: &ModelBundleContainer,
        models: &ModelContainer,
        bundle_key: crate::handles::ModelBundleKey,
    ) -> u32 {
        let Some(bundle) = bundles.get(bundle_key) else {
            return 0;
        };
        let data: Vec<GpuModelData> = bundle
            .models()
            .iter()
            .filter_map(|&key| models.get(key))
            .map(|m| GpuModelData {
                model_matrix: model_matrix_columns(m.transform.to_matrix()),
            })
            .collect();
        let count = data.len() as u32;
        self.model_data.write_at(0, &data);
        count
    }

    /// Reset the counter then dispatch the culling compute shader:
    /// `⌈model_count / 64⌉` workgroups, one invocation per model. The
    /// caller must have already bound the frame's descriptor buffer (with
    /// the per-mesh AABBs, per-model data, argument and counter buffers
    /// written into it) at `COMPUTE` before calling this. `frustum_planes`
    /// is `(normal.x, normal.y, normal.z, d)` per half-space, in
    /// `Frustum::planes`'s `left, right, bottom, top, near, far` order.
    pub fn record_cull_pass(
        &self,
        cmd: &CommandBuffer,
        pipeline_layout: vk::PipelineLayout,
        pipeline: vk::Pipeline,
        model_count: u32,
        frustum_planes: [[f32; 4]; 6],
    ) {
        cmd.fill_buffer(self.counter_buffer.handle(), 0, 8, 0);

        let barrier = vk::BufferMemoryBarrier2::builder()
            .src_stage_mask(vk::PipelineStageFlags2::TRANSFER)
            .src_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags2::COMPUTE_SHADER)
            .dst_access_mask(vk::AccessFlags2::SHADER_WRITE)
            .buffer(self.counter_buffer.handle())
            .offset(0)
            .size(8)
            .build();
        let dep_info = vk::DependencyInfo::builder().buffer_memory_barriers(std::slice::from_ref(&barrier));
        cmd.pipeline_barrier2(&dep_info);

        cmd.bind_pipeline(vk::PipelineBindPoint::COMPUTE, pipeline);
        cmd.push_constants(pipeline_layout, vk::ShaderStageFlags::COMPUTE, 0, &cull_push_constants(model_count, frustum_planes));
        let dispatch_count = model_count.div_ceil(WORKGROUP_SIZE).max(1);
        cmd.dispatch(dispatch_count, 1, 1);

        let to_indirect = vk::BufferMemoryBarrier2::builder()
            .src_stage_mask(vk::PipelineStageFlags2::COMPUTE_SHADER)
            .src_access_mask(vk::AccessFlags2::SHADER_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags2::DRAW_INDIRECT)
            .dst_access_mask(vk::AccessFlags2::INDIRECT_COMMAND_READ)
            .buffer(self.argument_buffer.handle())
            .offset(0)
            .size(vk::WHOLE_SIZE)
            .build();
        let counter_barrier = vk::BufferMemoryBarrier2 {
            buffer: self.counter_buffer.handle(),
            ..to_indirect
        };
        let barriers = [to_indirect, counter_barrier];
        let dep_info = vk::DependencyInfo::builder().buffer_memory_barriers(&barriers);
        cmd.pipeline_barrier2(&dep_info);
    }

    pub fn draw_indirect(&self, cmd: &CommandBuffer, mesh_manager: &MeshManagerVsIndirect) {
        cmd.bind_vertex_buffers(0, &[mesh_manager.vertex_buffer()], &[0]);
        cmd.bind_index_buffer(mesh_manager.index_buffer(), 0, vk::IndexType::UINT32);
        cmd.draw_indexed_indirect_count(
            self.argument_buffer.handle(),
            0,
            self.counter_buffer.handle(),
            0,
            self.max_models as u32,
            std::mem::size_of::<GpuDrawIndexedIndirectCommand>() as u32,
        );
    }
}

/// Pack `(model_count, pad, frustum_planes[6])` into the cull shader's push
/// constant block: 8 bytes of count/padding, then six tightly packed
/// `vec4`s (96 bytes), for 104 bytes total.
fn cull_push_constants(model_count: u32, frustum_planes: [[f32; 4]; 6]) -> [u8; 104] {
    let mut bytes = [0u8; 104];
    bytes[0..4].copy_from_slice(&model_count.to_ne_bytes());
    for (i, plane) in frustum_planes.iter().enumerate() {
        let base = 8 + i * 16;
        for (j, component) in plane.iter().enumerate() {
            let offset = base + j * 4;
            bytes[offset..offset + 4].copy_from_slice(&component.to_ne_bytes());
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cull_push_constants_packs_count_then_planes() {
        let planes = [
            [1.0, 0.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0, 1.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, -1.0, 10.0],
        ];
        let bytes = cull_push_constants(7, planes);
        assert_eq!(u32::from_ne_bytes(bytes[0..4].try_into().unwrap()), 7);
        for (i, plane) in planes.iter().enumerate() {
            let base = 8 + i * 16;
            for (j, &component) in plane.iter().enumerate() {
                let offset = base + j * 4;
                assert_eq!(f32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap()), component);
            }
        }
    }
}

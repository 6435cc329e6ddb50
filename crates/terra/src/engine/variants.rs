//! The active `(MeshManager, ModelManager)` pair (spec §4.9): exactly one
//! of the three is live per `Renderer`, chosen from
//! [`RenderEngineKind`](crate::config::RenderEngineKind) at construction.

use ash::vk;

use crate::error::Result;
use crate::foundation::Aabb;
use crate::handles::MeshBundleKey;
use crate::memory::MemoryManager;
use crate::mesh::{MeshManagerMs, MeshManagerVsIndirect, MeshManagerVsIndividual};
use crate::model::{ModelManagerMeshShader, ModelManagerVsIndirect, ModelManagerVsIndividual};
use crate::staging::{StagingBufferManager, TemporaryDataBuffer};
use crate::sync::CommandBuffer;

/// Upload payload for `add_mesh_bundle`, shaped per engine variant (spec
/// §3's "VS bundles" vs "MS bundles" distinction).
pub enum MeshBundleSource<'a> {
    Vertex {
        vertex_bytes: &'a [u8],
        indices: &'a [u32],
        aabb: Aabb,
    },
    Mesh {
        vertices: &'a [u8],
        vertex_indices: &'a [u8],
        primitive_indices: &'a [u8],
        meshlet_descriptors: &'a [u8],
        meshlet_count: u32,
        aabb: Aabb,
    },
}

pub struct VsIndividualResources {
    pub mesh: MeshManagerVsIndividual,
    pub model: ModelManagerVsIndividual,
}

pub struct VsIndirectResources {
    pub mesh: MeshManagerVsIndirect,
    pub model: ModelManagerVsIndirect,
}

pub struct MeshShaderResources {
    pub mesh: MeshManagerMs,
    pub model: ModelManagerMeshShader,
}

/// Owns exactly one engine variant's mesh/model managers. Never wraps the
/// three behind a shared trait: each variant's draw call has a genuinely
/// different shape (spec §4.9), and `Renderer::render` matches on this enum
/// directly rather than going through a lowest-common-denominator API.
pub enum EngineVariant {
    VsIndividual(VsIndividualResources),
    VsIndirect(VsIndirectResources),
    MeshShader(MeshShaderResources),
}

impl EngineVariant {
    pub fn new_vs_individual(
        device: ash::Device,
        memory: &mut MemoryManager,
        vertex_stride: u64,
        initial_size: u64,
        max_models: usize,
    ) -> Result<Self> {
        Ok(Self::VsIndividual(VsIndividualResources {
            mesh: MeshManagerVsIndividual::new(device.clone(), memory, vertex_stride, initial_size)?,
            model: ModelManagerVsIndividual::new(device, memory, max_models)?,
        }))
    }

    pub fn new_vs_indirect(
        device: ash::Device,
        memory: &mut MemoryManager,
        vertex_stride: u64,
        initial_size: u64,
        max_models: usize,
    ) -> Result<Self> {
        Ok(Self::VsIndirect(VsIndirectResources {
            mesh: MeshManagerVsIndirect::new(device.clone(), memory, vertex_stride, initial_size)?,
            model: ModelManagerVsIndirect::new(device, memory, max_models)?,
        }))
    }

    pub fn new_mesh_shader(
        device: ash::Device,
        memory: &mut MemoryManager,
        meshlet_descriptor_stride: u64,
        initial_size: u64,
    ) -> Result<Self> {
        Ok(Self::MeshShader(MeshShaderResources {
            mesh: MeshManagerMs::new(device, memory, meshlet_descriptor_stride, initial_size)?,
            model: ModelManagerMeshShader::default(),
        }))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_mesh_bundle(
        &mut self,
        device: &ash::Device,
        memory: &mut MemoryManager,
        temp_data: &mut TemporaryDataBuffer,
        staging: &mut StagingBufferManager,
        source: MeshBundleSource<'_>,
    ) -> Result<MeshBundleKey> {
        match (self, source) {
            (Self::VsIndividual(r), MeshBundleSource::Vertex { vertex_bytes, indices, aabb }) => {
                r.mesh.upload_mesh(device, memory, temp_data, staging, vertex_bytes, indices, aabb)
            }
            (Self::VsIndirect(r), MeshBundleSource::Vertex { vertex_bytes, indices, aabb }) => {
                r.mesh.upload_mesh(device, memory, temp_data, staging, vertex_bytes, indices, aabb)
            }
            (
                Self::MeshShader(r),
                MeshBundleSource::Mesh {
                    vertices,
                    vertex_indices,
                    primitive_indices,
                    meshlet_descriptors,
                    meshlet_count,
                    aabb,
                },
            ) => {
                let (key, offsets) = r.mesh.reserve_mesh(
                    device,
                    memory,
                    temp_data,
                    vertices.len() as u64,
                    vertex_indices.len() as u64,
                    primitive_indices.len() as u64,
                    meshlet_count,
                    aabb,
                )?;
                r.mesh.upload_bytes(staging, &offsets, vertices, vertex_indices, primitive_indices, meshlet_descriptors);
                Ok(key)
            }
            _ => unreachable!("mesh bundle source shape must match the active engine variant"),
        }
    }

    /// Record the pending full-buffer copies for every shared buffer this
    /// variant owns (spec §4.3's growth contract), on the transfer command
    /// buffer.
    pub fn copy_old_buffers(&mut self, cmd: &CommandBuffer) {
        match self {
            Self::VsIndividual(r) => r.mesh.copy_old_buffers(cmd),
            Self::VsIndirect(r) => r.mesh.copy_old_buffers(cmd),
            Self::MeshShader(r) => r.mesh.copy_old_buffers(cmd),
        }
    }

    /// Vertex buffer binding used by the VS variants' `vkCmdBindVertexBuffers`.
    pub fn vs_vertex_buffer(&self) -> Option<vk::Buffer> {
        match self {
            Self::VsIndividual(r) => Some(r.mesh.vertex_buffer()),
            Self::VsIndirect(r) => Some(r.mesh.vertex_buffer()),
            Self::MeshShader(_) => None,
        }
    }
}

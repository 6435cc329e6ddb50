//! `ModelManagerMeshShader` (spec §4.9): draws one `vkCmdDrawMeshTasksEXT`
//! per model bundle, with a two-`u32` push constant `(model_index,
//! meshlet_offset)` selecting the bundle's meshlet range.

use ash::extensions::ext::MeshShader as MeshShaderExt;
use ash::vk;

use crate::mesh::MeshManagerMs;
use crate::sync::CommandBuffer;

use super::bundle::ModelBundleContainer;
use super::container::ModelContainer;

#[derive(Default)]
pub struct ModelManagerMeshShader;

impl ModelManagerMeshShader {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(
        &self,
        cmd: &CommandBuffer,
        mesh_shader_ext: &MeshShaderExt,
        pipeline_layout: vk::PipelineLayout,
        mesh_manager: &MeshManagerMs,
        bundles: &ModelBundleContainer,
        models: &ModelContainer,
        bundle_key: crate::handles::ModelBundleKey,
    ) {
        let Some(bundle) = bundles.get(bundle_key) else { return };

        for (model_index, &key) in bundle.models().iter().enumerate() {
            let Some(model) = models.get(key) else { continue };
            if !model.visible {
                continue;
            }
            let Some(mesh) = mesh_manager.bundle(model.mesh_bundle) else { continue };

            let push_data = push_constant_bytes(model_index as u32, mesh.meshlet_offset);
            cmd.push_constants(pipeline_layout, vk::ShaderStageFlags::MESH_EXT, 0, &push_data);

            unsafe {
                mesh_shader_ext.cmd_draw_mesh_tasks(cmd.handle(), mesh.meshlet_count, 1, 1);
            }
        }
    }
}

/// Pack the two-`u32` `(model_index, meshlet_offset)` push constant (spec
/// §4.9's MS draw).
fn push_constant_bytes(model_index: u32, meshlet_offset: u32) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes[0..4].copy_from_slice(&model_index.to_ne_bytes());
    bytes[4..8].copy_from_slice(&meshlet_offset.to_ne_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decodes the packed bytes back out with `from_ne_bytes` and checks
    /// against the inputs directly, rather than comparing two calls to
    /// `push_constant_bytes` against each other (which would pass even if
    /// the packing were wrong, as long as it were consistently wrong).
    #[test]
    fn boundary_scenario_5_mesh_shader_draw_push_constants() {
        let bytes = push_constant_bytes(1, 3);
        assert_eq!(bytes.len(), 8);
        let model_index = u32::from_ne_bytes(bytes[0..4].try_into().unwrap());
        let meshlet_offset = u32::from_ne_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(model_index, 1);
        assert_eq!(meshlet_offset, 3);
    }

    /// `draw`'s per-model `meshlet_offset` comes from the mesh bundle it
    /// looked up (set once at mesh upload, in `MeshManagerMs::add_mesh`),
    /// not from any running total over the models drawn this call — so
    /// two models sharing a mesh bundle push the same offset.
    #[test]
    fn push_constant_bytes_uses_the_looked_up_mesh_offset_not_a_running_total() {
        let shared_mesh_offset = 7u32;
        let first = push_constant_bytes(0, shared_mesh_offset);
        let second = push_constant_bytes(1, shared_mesh_offset);
        assert_eq!(u32::from_ne_bytes(first[4..8].try_into().unwrap()), shared_mesh_offset);
        assert_eq!(u32::from_ne_bytes(second[4..8].try_into().unwrap()), shared_mesh_offset);
        assert_ne!(first, second);
    }
}

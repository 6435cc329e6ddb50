//! Externally-comparable pipeline descriptions used as `PipelineManager`
//! cache keys (spec §4.7): two descriptions that are `Eq` always produce
//! the same pipeline, so `add_or_get` can dedupe by value rather than by
//! shader path alone.

use std::path::PathBuf;

use ash::vk;

/// Shader stage set for a graphics pipeline. Exactly one of the vertex or
/// mesh-shading paths is populated per spec §4.9's three engine variants.
#[derive(Clone, PartialEq, Eq)]
pub enum ShaderStages {
    Vertex {
        vertex: PathBuf,
        fragment: PathBuf,
    },
    Mesh {
        task: Option<PathBuf>,
        mesh: PathBuf,
        fragment: PathBuf,
    },
}

/// A value-comparable description of everything that participates in
/// `vkCreateGraphicsPipelines`. Grounded on the builder calls spec §4.7
/// names: `SetInputAssembler`, `SetVertexStage`/`SetMeshStage`/
/// `SetTaskStage`, `SetDepthStencilState`, `AddColourAttachment`,
/// `SetCullMode`, `AddDynamicState`.
#[derive(Clone, PartialEq, Eq)]
pub struct ExternalGraphicsPipeline {
    pub stages: ShaderStages,
    pub topology: vk::PrimitiveTopology,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: vk::CompareOp,
    pub colour_formats: Vec<vk::Format>,
    pub colour_blend: Vec<bool>,
    pub depth_format: Option<vk::Format>,
    pub extra_dynamic_state: Vec<vk::DynamicState>,
}

impl ExternalGraphicsPipeline {
    /// Every graphics pipeline always carries `VIEWPORT` and `SCISSOR` as
    /// dynamic state on top of whatever the builder adds explicitly.
    pub fn dynamic_states(&self) -> Vec<vk::DynamicState> {
        let mut states = vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        states.extend(self.extra_dynamic_state.iter().copied());
        states
    }
}

/// A value-comparable description of a compute pipeline.
#[derive(Clone, PartialEq, Eq)]
pub struct ExternalComputePipeline {
    pub shader: PathBuf,
}

// vk::Format/PrimitiveTopology/CullModeFlags/FrontFace/CompareOp/DynamicState
// are all plain bitflag/enum newtypes over integers and already derive Eq,
// so deriving PartialEq/Eq above is sound without a manual impl.

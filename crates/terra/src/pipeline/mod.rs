//! Pipeline managers (spec §4.7): graphics and compute pipelines built
//! against a shared `VkPipelineLayout`, deduplicated by value-equal
//! descriptions rather than rebuilt per draw.

mod compute;
mod description;
mod graphics;
mod manager;
mod shader_module;

pub use compute::ComputePipelineBuilder;
pub use description::{ExternalComputePipeline, ExternalGraphicsPipeline, ShaderStages};
pub use graphics::GraphicsPipelineBuilder;
pub use manager::PipelineManager;
pub use shader_module::ShaderModule;

//! Compute pipeline builder (spec §4.7).

use ash::{vk, Device};

use crate::error::{Error, Result};

use super::description::ExternalComputePipeline;
use super::shader_module::ShaderModule;

pub struct ComputePipelineBuilder {
    description: ExternalComputePipeline,
}

impl ComputePipelineBuilder {
    pub fn new(shader: impl Into<std::path::PathBuf>) -> Self {
        Self {
            description: ExternalComputePipeline { shader: shader.into() },
        }
    }

    pub fn description(&self) -> &ExternalComputePipeline {
        &self.description
    }

    pub fn build(
        self,
        device: &Device,
        layout: vk::PipelineLayout,
        shader_root: &std::path::Path,
    ) -> Result<vk::Pipeline> {
        let module = ShaderModule::from_file(
            device.clone(),
            shader_root,
            self.description.shader.to_str().unwrap_or_default(),
        )?;
        let stage = module.stage_info(vk::ShaderStageFlags::COMPUTE);
        let create_info = vk::ComputePipelineCreateInfo::builder().stage(stage).layout(layout);
        let pipelines = unsafe {
            device.create_compute_pipelines(vk::PipelineCache::null(), &[create_info.build()], None)
        }
        .map_err(|(_, code)| Error::api("creating compute pipeline", code))?;
        Ok(pipelines[0])
    }
}

//! Graphics pipeline builder (spec §4.7) targeting dynamic rendering —
//! `VkPipelineRenderingCreateInfo` in place of a `VkRenderPass` object.

use ash::{vk, Device};

use crate::error::{Error, Result, VkResultExt};

use super::description::{ExternalGraphicsPipeline, ShaderStages};
use super::shader_module::ShaderModule;

pub struct GraphicsPipelineBuilder {
    description: ExternalGraphicsPipeline,
}

impl GraphicsPipelineBuilder {
    pub fn new() -> Self {
        Self {
            description: ExternalGraphicsPipeline {
                stages: ShaderStages::Vertex {
                    vertex: Default::default(),
                    fragment: Default::default(),
                },
                topology: vk::PrimitiveTopology::TRIANGLE_LIST,
                cull_mode: vk::CullModeFlags::BACK,
                front_face: vk::FrontFace::COUNTER_CLOCKWISE,
                depth_test: true,
                depth_write: true,
                depth_compare: vk::CompareOp::LESS,
                colour_formats: Vec::new(),
                colour_blend: Vec::new(),
                depth_format: None,
                extra_dynamic_state: Vec::new(),
            },
        }
    }

    pub fn set_input_assembler(mut self, topology: vk::PrimitiveTopology) -> Self {
        self.description.topology = topology;
        self
    }

    pub fn set_vertex_stage(mut self, vertex: impl Into<std::path::PathBuf>, fragment: impl Into<std::path::PathBuf>) -> Self {
        self.description.stages = ShaderStages::Vertex {
            vertex: vertex.into(),
            fragment: fragment.into(),
        };
        self
    }

    pub fn set_mesh_stage(mut self, mesh: impl Into<std::path::PathBuf>, fragment: impl Into<std::path::PathBuf>) -> Self {
        let task = match &self.description.stages {
            ShaderStages::Mesh { task, .. } => task.clone(),
            ShaderStages::Vertex { .. } => None,
        };
        self.description.stages = ShaderStages::Mesh {
            task,
            mesh: mesh.into(),
            fragment: fragment.into(),
        };
        self
    }

    pub fn set_task_stage(mut self, task: impl Into<std::path::PathBuf>) -> Self {
        if let ShaderStages::Mesh { task: slot, .. } = &mut self.description.stages {
            *slot = Some(task.into());
        }
        self
    }

    pub fn set_depth_stencil_state(mut self, test: bool, write: bool, compare: vk::CompareOp, format: vk::Format) -> Self {
        self.description.depth_test = test;
        self.description.depth_write = write;
        self.description.depth_compare = compare;
        self.description.depth_format = Some(format);
        self
    }

    pub fn add_colour_attachment(mut self, format: vk::Format, blend: bool) -> Self {
        self.description.colour_formats.push(format);
        self.description.colour_blend.push(blend);
        self
    }

    pub fn set_cull_mode(mut self, cull_mode: vk::CullModeFlags) -> Self {
        self.description.cull_mode = cull_mode;
        self
    }

    pub fn add_dynamic_state(mut self, state: vk::DynamicState) -> Self {
        self.description.extra_dynamic_state.push(state);
        self
    }

    pub fn description(&self) -> &ExternalGraphicsPipeline {
        &self.description
    }

    /// Rebuild a builder from a previously-produced description, used by
    /// `PipelineManager::recreate_all` when a shader root change forces
    /// every pipeline back through `build`.
    pub fn from_description(description: ExternalGraphicsPipeline) -> Self {
        Self { description }
    }

    /// Build the pipeline against `layout`, loading shader modules from
    /// `shader_root`.
    pub fn build(
        self,
        device: &Device,
        layout: vk::PipelineLayout,
        shader_root: &std::path::Path,
    ) -> Result<vk::Pipeline> {
        let desc = &self.description;

        let (stages, modules): (Vec<vk::PipelineShaderStageCreateInfo>, Vec<ShaderModule>) =
            match &desc.stages {
                ShaderStages::Vertex { vertex, fragment } => {
                    let vs = ShaderModule::from_file(
                        device.clone(),
                        shader_root,
                        vertex.to_str().unwrap_or_default(),
                    )?;
                    let fs = ShaderModule::from_file(
                        device.clone(),
                        shader_root,
                        fragment.to_str().unwrap_or_default(),
                    )?;
                    let stages = vec![
                        vs.stage_info(vk::ShaderStageFlags::VERTEX),
                        fs.stage_info(vk::ShaderStageFlags::FRAGMENT),
                    ];
                    (stages, vec![vs, fs])
                }
                ShaderStages::Mesh { task, mesh, fragment } => {
                    let mut stages = Vec::new();
                    let mut modules = Vec::new();
                    if let Some(task) = task {
                        let ts = ShaderModule::from_file(
                            device.clone(),
                            shader_root,
                            task.to_str().unwrap_or_default(),
                        )?;
                        stages.push(ts.stage_info(vk::ShaderStageFlags::TASK_EXT));
                        modules.push(ts);
                    }
                    let ms = ShaderModule::from_file(
                        device.clone(),
                        shader_root,
                        mesh.to_str().unwrap_or_default(),
                    )?;
                    let fs = ShaderModule::from_file(
                        device.clone(),
                        shader_root,
                        fragment.to_str().unwrap_or_default(),
                    )?;
                    stages.push(ms.stage_info(vk::ShaderStageFlags::MESH_EXT));
                    stages.push(fs.stage_info(vk::ShaderStageFlags::FRAGMENT));
                    modules.push(ms);
                    modules.push(fs);
                    (stages, modules)
                }
            };

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(desc.topology)
            .primitive_restart_enable(false);
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder();
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let dynamic_states = desc.dynamic_states();
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(desc.cull_mode)
            .front_face(desc.front_face)
            .depth_bias_enable(false);

        let multisample = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(desc.depth_test)
            .depth_write_enable(desc.depth_write)
            .depth_compare_op(desc.depth_compare)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = desc
            .colour_blend
            .iter()
            .map(|&blend| {
                vk::PipelineColorBlendAttachmentState::builder()
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
                    .blend_enable(blend)
                    .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                    .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                    .color_blend_op(vk::BlendOp::ADD)
                    .src_alpha_blend_factor(vk::BlendFactor::ONE)
                    .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                    .alpha_blend_op(vk::BlendOp::ADD)
                    .build()
            })
            .collect();
        let colour_blend =
            vk::PipelineColorBlendStateCreateInfo::builder().logic_op_enable(false).attachments(&blend_attachments);

        let mut rendering_info = vk::PipelineRenderingCreateInfo::builder()
            .color_attachment_formats(&desc.colour_formats);
        if let Some(depth_format) = desc.depth_format {
            rendering_info = rendering_info.depth_attachment_format(depth_format);
        }

        let mut create_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&colour_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .push_next(&mut rendering_info);
        create_info.render_pass = vk::RenderPass::null();

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[create_info.build()], None)
        }
        .map_err(|(_, code)| Error::api("creating graphics pipeline", code))?;

        drop(modules);
        Ok(pipelines[0])
    }
}

impl Default for GraphicsPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

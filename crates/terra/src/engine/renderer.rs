//! `Renderer`: the top-level facade (spec §6) wiring every subsystem —
//! instance/device bootstrap, swapchain, memory, staging, descriptor
//! buffer, pipelines, the active engine variant, and per-frame submission
//! — into the single object an application drives.

use std::path::PathBuf;

use ash::vk;
use slotmap::SlotMap;

use crate::config::{RenderEngineKind, RendererConfig};
use crate::descriptor::{DescriptorBuffer, DescriptorSetLayoutBuilder, PipelineLayout};
use crate::error::{Error, Result};
use crate::external::{
    ExternalBindingDetails, ExternalBufferType, ExternalTextureFlags, ExternalTextureType,
    VkExternalResourceFactory, VkExternalResourceManager,
};
use crate::foundation::Frustum;
use crate::handles::{
    CameraKey, ExternalBufferKey, ExternalTextureKey, MeshBundleKey, ModelBundleKey, ModelKey,
    PipelineKey, RenderPassKey, TextureKey,
};
use crate::memory::MemoryManager;
use crate::model::{Model, ModelBundle, ModelBundleContainer, ModelContainer};
use crate::pipeline::{
    ComputePipelineBuilder, ExternalComputePipeline, ExternalGraphicsPipeline, GraphicsPipelineBuilder,
    PipelineManager,
};
use crate::render_pass::{PipelineDetails, VkRenderPassManager};
use crate::resources::{ImageView, Sampler, Texture};
use crate::staging::StagingBufferManager;
use crate::sync::{BinarySemaphore, CommandQueue, Fence, SubmitDescription, TimelineSemaphore};

use super::camera::{Camera, CameraContainer};
use super::context::VulkanContext;
use super::frame::FrameRecord;
use super::swapchain::Swapchain;
use super::variants::{EngineVariant, MeshBundleSource};
use super::window::Window;

/// Binding slots inside descriptor set 0, the only set Terra's shaders use
/// (spec §4.6): bindless textures plus a small reserved range of UBO/SSBO
/// slots external resources can be wired to.
const BINDLESS_TEXTURE_SLOT: u32 = 0;
const EXTERNAL_UNIFORM_SLOT: u32 = 1;
const EXTERNAL_STORAGE_SLOT: u32 = 2;
const EXTERNAL_BINDING_CAPACITY: u32 = 16;
const PUSH_CONSTANT_SIZE: u32 = 128;

/// Reserved indices inside the external-storage-buffer slot used to wire
/// the VS-indirect culling compute pass's own inputs/outputs (spec §4.9).
/// Applications binding their own external storage buffers for the
/// VS-indirect variant must start at `CULL_RESERVED_STORAGE_SLOTS`.
const CULL_AABB_INDEX: u32 = 0;
const CULL_MODEL_DATA_INDEX: u32 = 1;
const CULL_ARGUMENT_INDEX: u32 = 2;
const CULL_COUNTER_INDEX: u32 = 3;
#[allow(dead_code)]
const CULL_RESERVED_STORAGE_SLOTS: u32 = 4;

/// Per-pipeline draw-grouping record plus which `PipelineManager` slot backs
/// it, keyed by a stable [`PipelineKey`] the application holds onto.
struct PipelineEntry {
    manager_index: usize,
    details: PipelineDetails,
}

/// A texture bound into the bindless table, with the sampler it was bound
/// with (spec §4.10's "Samplers are independent" carried through to the
/// binding call).
struct BoundTexture {
    texture: Texture,
    view: ImageView,
}

/// Everything one render pass target needs: the pass's dynamic-rendering
/// bookkeeping plus the colour/depth textures it owns, if any (distinct
/// from the swapchain-backed default pass).
struct ExternalRenderPass {
    manager: VkRenderPassManager,
}

pub struct Renderer {
    context: VulkanContext,
    window: Window,
    swapchain: Swapchain,
    memory: MemoryManager,
    staging: StagingBufferManager,
    graphics_queue: CommandQueue,
    compute_queue: CommandQueue,
    transfer_queue: CommandQueue,
    frames: Vec<FrameRecord>,
    current_frame: usize,

    descriptor_layout_size: vk::DeviceSize,
    default_sampler: Sampler,
    pipeline_layout: PipelineLayout,
    graphics_pipelines: PipelineManager<ExternalGraphicsPipeline>,
    compute_pipelines: PipelineManager<ExternalComputePipeline>,
    cull_pipeline: Option<usize>,

    variant: EngineVariant,
    models: ModelContainer,
    model_bundles: ModelBundleContainer,
    pipelines: SlotMap<PipelineKey, PipelineEntry>,

    textures: SlotMap<TextureKey, BoundTexture>,
    bindless_capacity: u32,

    external_factory: VkExternalResourceFactory,
    external_manager: VkExternalResourceManager,
    external_buffers: SlotMap<ExternalBufferKey, u32>,
    external_textures: SlotMap<ExternalTextureKey, u32>,
    render_passes: SlotMap<RenderPassKey, ExternalRenderPass>,
    swapchain_render_pass: RenderPassKey,

    cameras: CameraContainer,

    background_colour: [f32; 4],
    shader_root: PathBuf,

    /// The swapchain's colour format as of the last `resize`, for
    /// `has_swapchain_format_changed`.
    previous_swapchain_format: vk::Format,
    swapchain_format_changed: bool,
}

impl Renderer {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        let mut window = Window::new(&config.application_name, config.initial_width, config.initial_height)?;
        let context = VulkanContext::new(&mut window, config)?;

        let mut memory = MemoryManager::new(
            context.device.clone(),
            context.instance.clone(),
            context.physical_device,
            config.initial_pool_budget,
            config.buddy_min_block_size,
        );

        let (fb_w, fb_h) = window.framebuffer_size();
        let swapchain = Swapchain::new(
            &context.instance,
            context.device.clone(),
            context.surface,
            &context.surface_loader,
            context.physical_device,
            vk::Extent2D { width: fb_w, height: fb_h },
            vk::SwapchainKHR::null(),
        )?;
        let swapchain_format = swapchain.format();

        let bindless_layout = DescriptorSetLayoutBuilder::new()
            .add_binding(
                BINDLESS_TEXTURE_SLOT,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                config.bindless_texture_capacity,
                vk::ShaderStageFlags::ALL,
            )
            .add_binding(
                EXTERNAL_UNIFORM_SLOT,
                vk::DescriptorType::UNIFORM_BUFFER,
                EXTERNAL_BINDING_CAPACITY,
                vk::ShaderStageFlags::ALL,
            )
            .add_binding(
                EXTERNAL_STORAGE_SLOT,
                vk::DescriptorType::STORAGE_BUFFER,
                EXTERNAL_BINDING_CAPACITY,
                vk::ShaderStageFlags::ALL,
            )
            .build(&context.device, &context.descriptor_buffer_ext)?;
        let set_layout_handle = bindless_layout.handle();
        let descriptor_layout_size = bindless_layout.size();

        let push_constant_range = vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX
                | vk::ShaderStageFlags::FRAGMENT
                | vk::ShaderStageFlags::COMPUTE
                | vk::ShaderStageFlags::MESH_EXT
                | vk::ShaderStageFlags::TASK_EXT,
            offset: 0,
            size: PUSH_CONSTANT_SIZE,
        };
        let pipeline_layout =
            PipelineLayout::new(context.device.clone(), &[set_layout_handle], &[push_constant_range])?;

        let shader_root = PathBuf::from(&config.shader_root);
        let graphics_pipelines =
            PipelineManager::new(context.device.clone(), pipeline_layout.handle(), shader_root.clone());
        let compute_pipelines =
            PipelineManager::new(context.device.clone(), pipeline_layout.handle(), shader_root.clone());

        let vertex_stride = std::mem::size_of::<[f32; 8]>() as u64;
        let initial_mesh_bytes = 1024 * 1024;
        let max_models = 4096;
        let variant = match config.engine_kind {
            RenderEngineKind::VsIndividual => EngineVariant::new_vs_individual(
                context.device.clone(),
                &mut memory,
                vertex_stride,
                initial_mesh_bytes,
                max_models,
            )?,
            RenderEngineKind::VsIndirect => EngineVariant::new_vs_indirect(
                context.device.clone(),
                &mut memory,
                vertex_stride,
                initial_mesh_bytes,
                max_models,
            )?,
            RenderEngineKind::MeshShader => {
                let meshlet_descriptor_stride = std::mem::size_of::<[u32; 4]>() as u64;
                EngineVariant::new_mesh_shader(
                    context.device.clone(),
                    &mut memory,
                    meshlet_descriptor_stride,
                    initial_mesh_bytes,
                )?
            }
        };

        let default_sampler = Sampler::default_sampler(context.device.clone())?;

        let mut frames = Vec::with_capacity(config.max_frames_in_flight);
        let needs_compute_timeline = matches!(config.engine_kind, RenderEngineKind::VsIndirect);
        for slot_index in 0..config.max_frames_in_flight {
            let layout = DescriptorSetLayoutBuilder::new()
                .add_binding(
                    BINDLESS_TEXTURE_SLOT,
                    vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    config.bindless_texture_capacity,
                    vk::ShaderStageFlags::ALL,
                )
                .add_binding(
                    EXTERNAL_UNIFORM_SLOT,
                    vk::DescriptorType::UNIFORM_BUFFER,
                    EXTERNAL_BINDING_CAPACITY,
                    vk::ShaderStageFlags::ALL,
                )
                .add_binding(
                    EXTERNAL_STORAGE_SLOT,
                    vk::DescriptorType::STORAGE_BUFFER,
                    EXTERNAL_BINDING_CAPACITY,
                    vk::ShaderStageFlags::ALL,
                )
                .build(&context.device, &context.descriptor_buffer_ext)?;
            let mut descriptor_buffer = DescriptorBuffer::new(
                context.device.clone(),
                context.descriptor_buffer_ext.clone(),
                vec![layout],
                context.descriptor_buffer_properties,
            );
            descriptor_buffer.create_buffer(&mut memory)?;
            frames.push(FrameRecord::new(
                context.device.clone(),
                slot_index,
                descriptor_buffer,
                needs_compute_timeline,
            )?);
        }

        let graphics_queue = CommandQueue::new(
            context.device.clone(),
            unsafe { context.device.get_device_queue(context.queue_families.graphics, 0) },
            context.queue_families.graphics,
            config.max_frames_in_flight,
        )?;
        let compute_queue = CommandQueue::new(
            context.device.clone(),
            unsafe { context.device.get_device_queue(context.queue_families.compute, 0) },
            context.queue_families.compute,
            config.max_frames_in_flight,
        )?;
        let transfer_queue = CommandQueue::new(
            context.device.clone(),
            unsafe { context.device.get_device_queue(context.queue_families.transfer, 0) },
            context.queue_families.transfer,
            config.max_frames_in_flight,
        )?;

        let mut render_passes: SlotMap<RenderPassKey, ExternalRenderPass> = SlotMap::with_key();
        let swapchain_render_pass = render_passes.insert(ExternalRenderPass {
            manager: VkRenderPassManager::new(2),
        });

        Ok(Self {
            context,
            window,
            swapchain,
            memory,
            staging: StagingBufferManager::new(),
            graphics_queue,
            compute_queue,
            transfer_queue,
            frames,
            current_frame: 0,
            descriptor_layout_size,
            default_sampler,
            pipeline_layout,
            graphics_pipelines,
            compute_pipelines,
            cull_pipeline: None,
            variant,
            models: ModelContainer::new(),
            model_bundles: ModelBundleContainer::new(),
            pipelines: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            bindless_capacity: config.bindless_texture_capacity,
            external_factory: VkExternalResourceFactory::new(),
            external_manager: VkExternalResourceManager::new(),
            external_buffers: SlotMap::with_key(),
            external_textures: SlotMap::with_key(),
            render_passes,
            swapchain_render_pass,
            cameras: CameraContainer::new(),
            background_colour: [0.0, 0.0, 0.0, 1.0],
            shader_root,
            previous_swapchain_format: swapchain_format,
            swapchain_format_changed: false,
        })
    }

    /// Build the VS-indirect variant's culling compute pipeline. Called
    /// once, after at least one mesh/model has been registered, since the
    /// compiled shader is fixed regardless of scene content. A no-op for
    /// the other two variants.
    pub fn finalise_initialisation(&mut self) -> Result<()> {
        if matches!(self.variant, EngineVariant::VsIndirect(_)) && self.cull_pipeline.is_none() {
            let description = ExternalComputePipeline {
                shader: PathBuf::from("cull.comp.spv"),
            };
            let builder = ComputePipelineBuilder::new(description.shader.clone());
            let index = self
                .compute_pipelines
                .add_or_get(description, move |device, layout, root| builder.build(device, layout, root))?;
            self.cull_pipeline = Some(index);
        }
        Ok(())
    }

    // -- Pipelines -------------------------------------------------------

    pub fn add_pipeline(&mut self, builder: GraphicsPipelineBuilder) -> Result<PipelineKey> {
        let description = builder.description().clone();
        let manager_index = self
            .graphics_pipelines
            .add_or_get(description, move |device, layout, root| builder.build(device, layout, root))?;
        Ok(self
            .pipelines
            .insert_with_key(|key| PipelineEntry { manager_index, details: PipelineDetails::new(key) }))
    }

    pub fn remove_pipeline(&mut self, key: PipelineKey) -> Result<()> {
        let entry = self.pipelines.remove(key).ok_or(Error::InvalidHandle("remove_pipeline"))?;
        self.graphics_pipelines.set_overwritable(entry.manager_index);
        Ok(())
    }

    pub fn set_shader_path(&mut self, root: impl Into<PathBuf>) -> Result<()> {
        self.shader_root = root.into();
        self.graphics_pipelines.set_shader_root(self.shader_root.clone());
        self.compute_pipelines.set_shader_root(self.shader_root.clone());
        self.graphics_pipelines
            .recreate_all(|description, device, layout, root| {
                GraphicsPipelineBuilder::from_description(description.clone()).build(device, layout, root)
            })?;
        self.compute_pipelines.recreate_all(|description, device, layout, root| {
            ComputePipelineBuilder::new(description.shader.clone()).build(device, layout, root)
        })?;
        Ok(())
    }

    // -- Mesh / model bundles --------------------------------------------

    pub fn add_mesh_bundle(&mut self, source: MeshBundleSource<'_>) -> Result<MeshBundleKey> {
        let frame = &mut self.frames[self.current_frame];
        self.variant.add_mesh_bundle(
            &self.context.device,
            &mut self.memory,
            &mut frame.temp_data,
            &mut self.staging,
            source,
        )
    }

    pub fn add_model_bundle(&mut self) -> ModelBundleKey {
        self.model_bundles.insert(ModelBundle::default())
    }

    pub fn remove_model_bundle(&mut self, key: ModelBundleKey) -> Result<()> {
        self.model_bundles.remove(key).ok_or(Error::InvalidHandle("remove_model_bundle")).map(drop)
    }

    pub fn add_model(
        &mut self,
        bundle: ModelBundleKey,
        pipeline: PipelineKey,
        mesh_bundle: MeshBundleKey,
        transform: crate::foundation::math::Transform,
    ) -> Result<ModelKey> {
        let model = self.models.insert(Model {
            transform,
            mesh_bundle,
            mesh_index: 0,
            visible: true,
        });
        let model_bundle = self
            .model_bundles
            .get_mut(bundle)
            .ok_or(Error::InvalidHandle("add_model: unknown model bundle"))?;
        let local_index = model_bundle.len() as u32;
        model_bundle.push(model);

        let entry = self.pipelines.get_mut(pipeline).ok_or(Error::InvalidHandle("add_model: unknown pipeline"))?;
        match entry.details.model_bundle_indices.iter().position(|&b| b == bundle) {
            Some(pos) => entry.details.pipeline_local_indices[pos].push(local_index),
            None => entry.details.push_bundle(bundle, vec![local_index]),
        }
        Ok(model)
    }

    pub fn remove_model(&mut self, key: ModelKey) -> Result<()> {
        self.models.remove(key).ok_or(Error::InvalidHandle("remove_model"))?;
        for bundle in self.model_bundles.iter_mut() {
            bundle.remove(key);
        }
        Ok(())
    }

    pub fn set_model_visible(&mut self, key: ModelKey, visible: bool) -> Result<()> {
        let model = self.models.get_mut(key).ok_or(Error::InvalidHandle("set_model_visible"))?;
        model.visible = visible;
        Ok(())
    }

    pub fn update_model_transform(&mut self, key: ModelKey, transform: crate::foundation::math::Transform) -> Result<()> {
        let model = self.models.get_mut(key).ok_or(Error::InvalidHandle("update_model_transform"))?;
        model.transform = transform;
        Ok(())
    }

    // -- Cameras -----------------------------------------------------------

    pub fn add_camera(&mut self, camera: Camera) -> CameraKey {
        self.cameras.insert(camera)
    }

    pub fn set_camera(&mut self, key: CameraKey) {
        self.cameras.set_active(key);
    }

    pub fn remove_camera(&mut self, key: CameraKey) {
        self.cameras.remove(key);
    }

    // -- Bindless textures --------------------------------------------------

    pub fn add_texture(&mut self, width: u32, height: u32, format: vk::Format, pixels: &[u8]) -> Result<TextureKey> {
        let texture = Texture::new(
            self.context.device.clone(),
            &mut self.memory,
            width,
            height,
            1,
            1,
            format,
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
            &[],
        )?;
        let view = ImageView::new(self.context.device.clone(), &texture, vk::ImageAspectFlags::COLOR, 0, 1)?;
        self.staging.add_texture(
            pixels,
            texture.handle(),
            texture.extent(),
            vk::ImageAspectFlags::COLOR,
            Some((
                self.graphics_queue.family_index(),
                vk::AccessFlags2::SHADER_SAMPLED_READ,
                vk::PipelineStageFlags2::FRAGMENT_SHADER,
            )),
        );
        Ok(self.textures.insert(BoundTexture { texture, view }))
    }

    pub fn bind_texture(&mut self, key: TextureKey, slot: u32) -> Result<()> {
        let bound = self.textures.get(key).ok_or(Error::InvalidHandle("bind_texture"))?;
        if slot >= self.bindless_capacity {
            return Err(Error::InvalidOperation(format!(
                "bindless slot {slot} exceeds capacity {}",
                self.bindless_capacity
            )));
        }
        for frame in &mut self.frames {
            frame.descriptor_buffer.set_combined_image_descriptor(
                0,
                BINDLESS_TEXTURE_SLOT,
                slot,
                bound.view.handle(),
                self.default_sampler.handle(),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
        }
        Ok(())
    }

    pub fn unbind_texture(&mut self, slot: u32) {
        for frame in &mut self.frames {
            frame.descriptor_buffer.set_combined_image_descriptor(
                0,
                BINDLESS_TEXTURE_SLOT,
                slot,
                vk::ImageView::null(),
                self.default_sampler.handle(),
                vk::ImageLayout::UNDEFINED,
            );
        }
    }

    pub fn remove_texture(&mut self, key: TextureKey) -> Result<()> {
        self.textures.remove(key).ok_or(Error::InvalidHandle("remove_texture")).map(drop)
    }

    // -- External resources -------------------------------------------------

    pub fn create_external_buffer(&mut self, size: vk::DeviceSize, ty: ExternalBufferType) -> Result<ExternalBufferKey> {
        let index = self.external_factory.create_external_buffer(self.context.device.clone(), &mut self.memory, size, ty)?;
        Ok(self.external_buffers.insert(index))
    }

    pub fn create_external_texture(
        &mut self,
        width: u32,
        height: u32,
        format: vk::Format,
        ty: ExternalTextureType,
        flags: ExternalTextureFlags,
    ) -> Result<ExternalTextureKey> {
        let index = self.external_factory.create_external_texture(
            self.context.device.clone(),
            &mut self.memory,
            width,
            height,
            format,
            ty,
            flags,
        )?;
        Ok(self.external_textures.insert(index))
    }

    pub fn upload_external_buffer_gpu_only_data(&mut self, key: ExternalBufferKey, data: &[u8], dst_offset: vk::DeviceSize) -> Result<()> {
        let index = *self.external_buffers.get(key).ok_or(Error::InvalidHandle("upload_external_buffer_gpu_only_data"))?;
        self.external_manager
            .upload_external_buffer_gpu_only_data(&mut self.staging, &self.external_factory, index, data, dst_offset);
        Ok(())
    }

    pub fn queue_external_buffer_gpu_copy(
        &mut self,
        src: ExternalBufferKey,
        dst: ExternalBufferKey,
        dst_offset: vk::DeviceSize,
        src_offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> Result<()> {
        let src_index = *self.external_buffers.get(src).ok_or(Error::InvalidHandle("queue_external_buffer_gpu_copy: src"))?;
        let dst_index = *self.external_buffers.get(dst).ok_or(Error::InvalidHandle("queue_external_buffer_gpu_copy: dst"))?;
        self.external_manager.queue_external_buffer_gpu_copy(src_index, dst_index, dst_offset, src_offset, size);
        Ok(())
    }

    pub fn update_external_buffer_descriptor(
        &mut self,
        key: ExternalBufferKey,
        slot: u32,
        descriptor_type: vk::DescriptorType,
        range: vk::DeviceSize,
    ) -> Result<()> {
        let index = *self.external_buffers.get(key).ok_or(Error::InvalidHandle("update_external_buffer_descriptor"))?;
        let binding = ExternalBindingDetails { set: 0, slot, descriptor_type };
        for frame in &mut self.frames {
            self.external_manager
                .update_descriptor(&frame.descriptor_buffer, &self.external_factory, index, &binding, range);
        }
        Ok(())
    }

    pub fn add_external_render_pass(&mut self) -> RenderPassKey {
        self.render_passes.insert(ExternalRenderPass {
            manager: VkRenderPassManager::new(4),
        })
    }

    pub fn get_external_render_pass(&mut self, key: RenderPassKey) -> Result<&mut VkRenderPassManager> {
        self.render_passes
            .get_mut(key)
            .map(|pass| &mut pass.manager)
            .ok_or(Error::InvalidHandle("get_external_render_pass"))
    }

    pub fn swapchain_render_pass_key(&self) -> RenderPassKey {
        self.swapchain_render_pass
    }

    /// Colour format the swapchain's images were created with, for building
    /// graphics pipelines targeting the swapchain render pass.
    pub fn swapchain_format(&self) -> vk::Format {
        self.swapchain.format()
    }

    // -- Window / misc -------------------------------------------------------

    pub fn get_first_display_coordinates(&mut self) -> (i32, i32) {
        self.window.primary_monitor_position()
    }

    pub fn set_background_colour(&mut self, colour: [f32; 4]) {
        self.background_colour = colour;
    }

    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    pub fn poll_events(&mut self) {
        self.window.poll_events();
    }

    pub fn wait_for_gpu_to_finish(&self) -> Result<()> {
        unsafe { self.context.device.device_wait_idle() }.map_err(|e| Error::api("device_wait_idle", e))
    }

    pub fn resize(&mut self) -> Result<()> {
        self.wait_for_gpu_to_finish()?;
        let (w, h) = self.window.framebuffer_size();
        let old = self.swapchain.handle();
        self.swapchain = Swapchain::new(
            &self.context.instance,
            self.context.device.clone(),
            self.context.surface,
            &self.context.surface_loader,
            self.context.physical_device,
            vk::Extent2D { width: w, height: h },
            old,
        )?;
        let new_format = self.swapchain.format();
        self.swapchain_format_changed = new_format != self.previous_swapchain_format;
        self.previous_swapchain_format = new_format;
        Ok(())
    }

    /// Whether the most recent `resize` changed the swapchain's colour
    /// format (spec §8 boundary scenario 6) — e.g. the surface's preferred
    /// format changed across a display/monitor swap.
    pub fn has_swapchain_format_changed(&self) -> bool {
        self.swapchain_format_changed
    }

    // -- Per-frame render loop -----------------------------------------------

    /// Record and submit one frame: transfer, then (for VS-indirect) a
    /// culling compute pass, then graphics, then present — ordered per
    /// spec §4.5/§5 via a timeline semaphore chain plus one binary
    /// semaphore pair for acquire/present.
    pub fn render(&mut self) -> Result<()> {
        let slot = self.current_frame;
        self.frames[slot].begin_reuse()?;

        let (image_index, suboptimal) = self
            .swapchain
            .acquire_next_image(self.frames[slot].image_acquired_semaphore.handle())?;
        if suboptimal {
            self.resize()?;
            self.current_frame = (self.current_frame + 1) % self.frames.len();
            return Ok(());
        }

        self.record_transfer(slot)?;
        let transfer_value = self.frames[slot].transfer_timeline.next_signal_value();
        self.submit_transfer(slot, transfer_value)?;

        let compute_value = if matches!(self.variant, EngineVariant::VsIndirect(_)) {
            let value = self.frames[slot]
                .compute_timeline
                .as_mut()
                .expect("VS-indirect frame must carry a compute timeline")
                .next_signal_value();
            self.record_and_submit_compute(slot, transfer_value, value)?;
            Some(value)
        } else {
            None
        };

        self.record_and_submit_graphics(slot, image_index, transfer_value, compute_value)?;
        self.present(slot, image_index)?;

        self.frames[slot].last_transfer_value = transfer_value;
        if let Some(value) = compute_value {
            self.frames[slot].last_compute_value = value;
        }
        self.current_frame = (self.current_frame + 1) % self.frames.len();
        Ok(())
    }

    fn record_transfer(&mut self, slot: usize) -> Result<()> {
        let cmd = self.transfer_queue.command_buffer(slot);
        cmd.reset()?;
        cmd.begin()?;
        self.variant.copy_old_buffers(&cmd);
        self.staging.copy_and_clear(&self.context.device, &mut self.memory, &cmd, &mut self.frames[slot].temp_data)?;
        self.external_manager.flush_gpu_copies(&cmd, &self.external_factory);
        self.staging.release_ownership(&cmd, self.transfer_queue.family_index());
        cmd.end()?;
        Ok(())
    }

    fn submit_transfer(&mut self, slot: usize, signal_value: u64) -> Result<()> {
        let cmd = self.transfer_queue.command_buffer(slot).handle();
        let description = SubmitDescription::new()
            .command_buffer(cmd)
            .wait(
                self.frames[slot].image_acquired_semaphore.handle(),
                vk::PipelineStageFlags2::TRANSFER,
                0,
            )
            .signal(
                self.frames[slot].transfer_timeline.handle(),
                vk::PipelineStageFlags2::ALL_TRANSFER,
                signal_value,
            );
        let built = description.build();
        self.transfer_queue.submit(&[built.submit_info()], vk::Fence::null())
    }

    fn record_and_submit_compute(&mut self, slot: usize, wait_transfer: u64, signal_value: u64) -> Result<()> {
        let model_count = match &mut self.variant {
            EngineVariant::VsIndirect(r) => r.model.update_frame_data(&self.model_bundles, &self.models, default_bundle_key()),
            _ => return Ok(()),
        };
        let Some(pipeline_index) = self.cull_pipeline else {
            return Ok(());
        };
        let cmd = self.compute_queue.command_buffer(slot);
        cmd.reset()?;
        cmd.begin()?;
        if let EngineVariant::VsIndirect(r) = &self.variant {
            let aabb_data = r.mesh.aabb_buffer_snapshot();
            let model_data = r.model.model_data_snapshot();
            let argument_data = r.model.argument_buffer_snapshot();
            let counter_data = r.model.counter_buffer_snapshot();

            let frame = &mut self.frames[slot];
            frame.descriptor_buffer.set_storage_buffer_descriptor(
                0, EXTERNAL_STORAGE_SLOT, CULL_AABB_INDEX, aabb_data.device_address, aabb_data.size,
            );
            frame.descriptor_buffer.set_storage_buffer_descriptor(
                0, EXTERNAL_STORAGE_SLOT, CULL_MODEL_DATA_INDEX, model_data.device_address, model_data.size,
            );
            frame.descriptor_buffer.set_storage_buffer_descriptor(
                0, EXTERNAL_STORAGE_SLOT, CULL_ARGUMENT_INDEX, argument_data.device_address, argument_data.size,
            );
            frame.descriptor_buffer.set_storage_buffer_descriptor(
                0, EXTERNAL_STORAGE_SLOT, CULL_COUNTER_INDEX, counter_data.device_address, counter_data.size,
            );
            frame.descriptor_buffer.bind(cmd.handle(), self.pipeline_layout.handle(), vk::PipelineBindPoint::COMPUTE, 1);

            let extent = self.swapchain.extent();
            let aspect = extent.width as f32 / extent.height.max(1) as f32;
            let planes = self
                .cameras
                .active()
                .map(|camera| camera.frustum(aspect).planes())
                .unwrap_or([[0.0, 0.0, 0.0, 1.0]; 6]);

            r.model.record_cull_pass(&cmd, self.pipeline_layout.handle(), self.compute_pipelines.pipeline(pipeline_index), model_count, planes);
        }
        cmd.end()?;

        let description = SubmitDescription::new()
            .command_buffer(cmd.handle())
            .wait(
                self.frames[slot].transfer_timeline.handle(),
                vk::PipelineStageFlags2::COMPUTE_SHADER,
                wait_transfer,
            )
            .signal(
                self.frames[slot]
                    .compute_timeline
                    .as_ref()
                    .expect("checked above")
                    .handle(),
                vk::PipelineStageFlags2::COMPUTE_SHADER,
                signal_value,
            );
        let built = description.build();
        self.compute_queue.submit(&[built.submit_info()], vk::Fence::null())
    }

    fn record_and_submit_graphics(
        &mut self,
        slot: usize,
        image_index: u32,
        wait_transfer: u64,
        wait_compute: Option<u64>,
    ) -> Result<()> {
        let cmd = self.graphics_queue.command_buffer(slot);
        cmd.reset()?;
        cmd.begin()?;

        self.staging.acquire_ownership(&cmd, self.graphics_queue.family_index(), self.transfer_queue.family_index());

        let render_area = vk::Rect2D { offset: vk::Offset2D::default(), extent: self.swapchain.extent() };
        let clear = vk::ClearColorValue { float32: self.background_colour };
        {
            let pass = &mut self.render_passes[self.swapchain_render_pass].manager;
            pass.add_colour(self.swapchain.image_view(image_index as usize), clear, vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::STORE);
            pass.start_pass(&self.context.device, &cmd, render_area);
        }

        cmd.set_viewport(vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: render_area.extent.width as f32,
            height: render_area.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        cmd.set_scissor(render_area);

        self.frames[slot]
            .descriptor_buffer
            .bind(cmd.handle(), self.pipeline_layout.handle(), vk::PipelineBindPoint::GRAPHICS, 1);

        // VS-indirect refreshes its instance block inside the culling compute
        // pass; VS-individual has no such pass, so stream live transforms
        // into its instance buffer here, right before the draws that read it.
        if let EngineVariant::VsIndividual(r) = &mut self.variant {
            for entry in self.pipelines.values() {
                for &bundle_key in &entry.details.model_bundle_indices {
                    r.model.update_frame_data(&self.model_bundles, &self.models, bundle_key);
                }
            }
        }

        for entry in self.pipelines.values() {
            cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, self.graphics_pipelines.pipeline(entry.manager_index));
            for &bundle_key in &entry.details.model_bundle_indices {
                self.draw_bundle(&cmd, bundle_key)?;
            }
        }

        self.render_passes[self.swapchain_render_pass].manager.end_pass(&self.context.device, &cmd);
        cmd.end()?;

        // The swap-image-acquired wait lives on the transfer submit (spec
        // §4.5); graphics only needs to wait on transfer/compute completion,
        // which already happened after the image was acquired.
        let mut description = SubmitDescription::new()
            .command_buffer(cmd.handle())
            .wait(
                self.frames[slot].transfer_timeline.handle(),
                vk::PipelineStageFlags2::VERTEX_INPUT,
                wait_transfer,
            )
            .signal(self.frames[slot].present_semaphore.handle(), vk::PipelineStageFlags2::BOTTOM_OF_PIPE, 0);
        if let Some(value) = wait_compute {
            description = description.wait(
                self.frames[slot]
                    .compute_timeline
                    .as_ref()
                    .expect("checked above")
                    .handle(),
                vk::PipelineStageFlags2::DRAW_INDIRECT,
                value,
            );
        }
        let built = description.build();
        self.graphics_queue.submit(&[built.submit_info()], self.frames[slot].graphics_fence.handle())
    }

    fn draw_bundle(&self, cmd: &crate::sync::CommandBuffer, bundle_key: ModelBundleKey) -> Result<()> {
        match &self.variant {
            EngineVariant::VsIndividual(r) => {
                r.model.draw(cmd, &r.mesh, &self.model_bundles, &self.models, bundle_key);
            }
            EngineVariant::VsIndirect(r) => {
                r.model.draw_indirect(cmd, &r.mesh);
            }
            EngineVariant::MeshShader(r) => {
                let ext = self
                    .context
                    .mesh_shader_ext
                    .as_ref()
                    .expect("mesh shader extension must be loaded for the MeshShader variant");
                r.model.draw(cmd, ext, self.pipeline_layout.handle(), &r.mesh, &self.model_bundles, &self.models, bundle_key);
            }
        }
        Ok(())
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<()> {
        let wait_semaphores = [self.frames[slot].present_semaphore.handle()];
        let swapchains = [self.swapchain.handle()];
        let indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&indices);
        unsafe {
            self.swapchain
                .loader()
                .queue_present(self.graphics_queue.queue(), &present_info)
        }
        .map_err(|e| Error::api("presenting swapchain image", e))?;
        Ok(())
    }
}

/// Placeholder until model bundles carry their own per-variant key lookup;
/// VS-indirect draws every live model bundle through one shared instance
/// block sized at construction (`max_models`), so the culling pass always
/// walks the same key set rather than one bundle at a time.
fn default_bundle_key() -> ModelBundleKey {
    ModelBundleKey::default()
}

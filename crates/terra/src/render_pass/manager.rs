//! Dynamic-rendering render pass manager (spec §4.8) — not a
//! `VkRenderPass` object. Holds a `VkRenderingInfo` builder plus the start
//! barriers that must run immediately before `vkCmdBeginRendering`.

use ash::{vk, Device};

use crate::sync::CommandBuffer;

use super::barrier::ImageBarrierGroup;

struct ColourAttachment {
    view: vk::ImageView,
    clear: vk::ClearColorValue,
    load_op: vk::AttachmentLoadOp,
    store_op: vk::AttachmentStoreOp,
}

struct DepthStencilAttachment {
    view: vk::ImageView,
    clear: vk::ClearDepthStencilValue,
    load_op: vk::AttachmentLoadOp,
    store_op: vk::AttachmentStoreOp,
}

/// Builds and records one dynamic-rendering pass. `start_barriers` holds
/// whatever layout transitions must happen right before
/// `vkCmdBeginRendering`; callers populate it via `add_start_image_barrier`.
pub struct VkRenderPassManager {
    colour: Vec<ColourAttachment>,
    depth: Option<DepthStencilAttachment>,
    stencil: Option<DepthStencilAttachment>,
    start_barriers: ImageBarrierGroup,
}

impl VkRenderPassManager {
    pub fn new(barrier_capacity: usize) -> Self {
        Self {
            colour: Vec::new(),
            depth: None,
            stencil: None,
            start_barriers: ImageBarrierGroup::new(barrier_capacity),
        }
    }

    pub fn add_colour(
        &mut self,
        view: vk::ImageView,
        clear: vk::ClearColorValue,
        load_op: vk::AttachmentLoadOp,
        store_op: vk::AttachmentStoreOp,
    ) -> usize {
        self.colour.push(ColourAttachment { view, clear, load_op, store_op });
        self.colour.len() - 1
    }

    pub fn set_colour_view(&mut self, index: usize, view: vk::ImageView) {
        self.colour[index].view = view;
    }

    pub fn set_colour_clear(&mut self, index: usize, clear: vk::ClearColorValue) {
        self.colour[index].clear = clear;
    }

    pub fn set_depth(
        &mut self,
        view: vk::ImageView,
        clear: vk::ClearDepthStencilValue,
        load_op: vk::AttachmentLoadOp,
        store_op: vk::AttachmentStoreOp,
    ) {
        self.depth = Some(DepthStencilAttachment { view, clear, load_op, store_op });
    }

    pub fn set_stencil(
        &mut self,
        view: vk::ImageView,
        clear: vk::ClearDepthStencilValue,
        load_op: vk::AttachmentLoadOp,
        store_op: vk::AttachmentStoreOp,
    ) {
        self.stencil = Some(DepthStencilAttachment { view, clear, load_op, store_op });
    }

    pub fn set_depth_view(&mut self, view: vk::ImageView) {
        if let Some(depth) = &mut self.depth {
            depth.view = view;
        }
    }

    pub fn set_stencil_view(&mut self, view: vk::ImageView) {
        if let Some(stencil) = &mut self.stencil {
            stencil.view = view;
        }
    }

    pub fn set_depth_clear_colour(&mut self, clear: vk::ClearDepthStencilValue) {
        if let Some(depth) = &mut self.depth {
            depth.clear = clear;
        }
    }

    pub fn set_stencil_clear_colour(&mut self, clear: vk::ClearDepthStencilValue) {
        if let Some(stencil) = &mut self.stencil {
            stencil.clear = clear;
        }
    }

    pub fn add_start_image_barrier(&mut self, barrier: vk::ImageMemoryBarrier2) -> crate::error::Result<u32> {
        self.start_barriers.add(barrier)
    }

    pub fn set_barrier_image_view(&mut self, index: u32, image: vk::Image) {
        self.start_barriers.set_image_view(index, image);
    }

    pub fn set_src_stage(&mut self, index: u32, stage: vk::PipelineStageFlags2) {
        self.start_barriers.set_src_stage(index, stage);
    }

    /// Record start barriers (if any) then `vkCmdBeginRendering`.
    pub fn start_pass(&mut self, device: &Device, cmd: &CommandBuffer, render_area: vk::Rect2D) {
        if !self.start_barriers.is_empty() {
            let dep_info =
                vk::DependencyInfo::builder().image_memory_barriers(self.start_barriers.as_slice());
            cmd.pipeline_barrier2(&dep_info);
            self.start_barriers.clear();
        }

        let colour_attachments: Vec<vk::RenderingAttachmentInfo> = self
            .colour
            .iter()
            .map(|c| {
                vk::RenderingAttachmentInfo::builder()
                    .image_view(c.view)
                    .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .load_op(c.load_op)
                    .store_op(c.store_op)
                    .clear_value(vk::ClearValue { color: c.clear })
                    .build()
            })
            .collect();

        let mut rendering_info = vk::RenderingInfo::builder()
            .render_area(render_area)
            .layer_count(1)
            .color_attachments(&colour_attachments);

        let depth_info = self.depth.as_ref().map(|d| {
            vk::RenderingAttachmentInfo::builder()
                .image_view(d.view)
                .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .load_op(d.load_op)
                .store_op(d.store_op)
                .clear_value(vk::ClearValue { depth_stencil: d.clear })
                .build()
        });
        if let Some(depth_info) = &depth_info {
            rendering_info = rendering_info.depth_attachment(depth_info);
        }

        let stencil_info = self.stencil.as_ref().map(|s| {
            vk::RenderingAttachmentInfo::builder()
                .image_view(s.view)
                .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .load_op(s.load_op)
                .store_op(s.store_op)
                .clear_value(vk::ClearValue { depth_stencil: s.clear })
                .build()
        });
        if let Some(stencil_info) = &stencil_info {
            rendering_info = rendering_info.stencil_attachment(stencil_info);
        }

        unsafe {
            device.cmd_begin_rendering(cmd.handle(), &rendering_info);
        }
    }

    pub fn end_pass(&self, device: &Device, cmd: &CommandBuffer) {
        unsafe {
            device.cmd_end_rendering(cmd.handle());
        }
    }

    /// End the pass and blit the offscreen colour target into the
    /// swapchain backbuffer (spec §4.8's four-step contract).
    pub fn end_pass_for_swapchain(
        &self,
        device: &Device,
        cmd: &CommandBuffer,
        src_view_image: vk::Image,
        backbuffer_image: vk::Image,
        extent: vk::Extent3D,
    ) {
        unsafe {
            device.cmd_end_rendering(cmd.handle());
        }

        let to_transfer = [
            vk::ImageMemoryBarrier2::builder()
                .src_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
                .src_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
                .dst_stage_mask(vk::PipelineStageFlags2::TRANSFER)
                .dst_access_mask(vk::AccessFlags2::TRANSFER_READ)
                .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .new_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                .image(src_view_image)
                .subresource_range(colour_subresource())
                .build(),
            vk::ImageMemoryBarrier2::builder()
                .src_stage_mask(vk::PipelineStageFlags2::TOP_OF_PIPE)
                .src_access_mask(vk::AccessFlags2::empty())
                .dst_stage_mask(vk::PipelineStageFlags2::TRANSFER)
                .dst_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .image(backbuffer_image)
                .subresource_range(colour_subresource())
                .build(),
        ];
        let dep_info = vk::DependencyInfo::builder().image_memory_barriers(&to_transfer);
        cmd.pipeline_barrier2(&dep_info);

        cmd.copy_image(
            src_view_image,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            backbuffer_image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageCopy {
                src_subresource: colour_subresource_layers(),
                src_offset: vk::Offset3D::default(),
                dst_subresource: colour_subresource_layers(),
                dst_offset: vk::Offset3D::default(),
                extent,
            },
        );

        let to_present = vk::ImageMemoryBarrier2::builder()
            .src_stage_mask(vk::PipelineStageFlags2::TRANSFER)
            .src_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags2::BOTTOM_OF_PIPE)
            .dst_access_mask(vk::AccessFlags2::empty())
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .image(backbuffer_image)
            .subresource_range(colour_subresource())
            .build();
        let dep_info = vk::DependencyInfo::builder().image_memory_barriers(std::slice::from_ref(&to_present));
        cmd.pipeline_barrier2(&dep_info);
    }
}

fn colour_subresource() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn colour_subresource_layers() -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    }
}

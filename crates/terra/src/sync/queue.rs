//! Command queue and command buffer wrappers.

use ash::{vk, Device};

use crate::error::{Result, VkResultExt};

/// A thin RAII wrapper around one `VkCommandBuffer`, recorded into from a
/// [`CommandQueue`]'s pool. Exposes the handful of recording operations the
/// spec names explicitly (§4.5); anything else goes through `handle()`
/// directly against the `ash::Device`, matching the teacher's style of
/// keeping these wrappers thin passthroughs.
pub struct CommandBuffer {
    device: Device,
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    pub(crate) fn new(device: Device, buffer: vk::CommandBuffer) -> Self {
        Self { device, buffer }
    }

    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    pub fn reset(&self) -> Result<()> {
        unsafe {
            self.device
                .reset_command_buffer(self.buffer, vk::CommandBufferResetFlags::empty())
        }
        .vk_ctx("resetting command buffer")
    }

    pub fn begin(&self) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device.begin_command_buffer(self.buffer, &begin_info) }
            .vk_ctx("beginning command buffer")
    }

    pub fn end(&self) -> Result<()> {
        unsafe { self.device.end_command_buffer(self.buffer) }.vk_ctx("ending command buffer")
    }

    pub fn copy_buffer(&self, src: vk::Buffer, dst: vk::Buffer, region: vk::BufferCopy) {
        unsafe {
            self.device.cmd_copy_buffer(self.buffer, src, dst, &[region]);
        }
    }

    pub fn copy_buffer_to_image(
        &self,
        src: vk::Buffer,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        region: vk::BufferImageCopy,
    ) {
        unsafe {
            self.device
                .cmd_copy_buffer_to_image(self.buffer, src, dst, dst_layout, &[region]);
        }
    }

    pub fn copy_image(
        &self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        region: vk::ImageCopy,
    ) {
        unsafe {
            self.device
                .cmd_copy_image(self.buffer, src, src_layout, dst, dst_layout, &[region]);
        }
    }

    pub fn pipeline_barrier(
        &self,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        buffer_barriers: &[vk::BufferMemoryBarrier],
        image_barriers: &[vk::ImageMemoryBarrier],
    ) {
        unsafe {
            self.device.cmd_pipeline_barrier(
                self.buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                buffer_barriers,
                image_barriers,
            );
        }
    }

    /// Synchronization2 dependency: used everywhere start-barriers and
    /// queue-ownership-transfer barriers are recorded, so that access/stage
    /// masks line up with the `VkSubmitInfo2`-based submission builder.
    pub fn pipeline_barrier2(&self, dependency_info: &vk::DependencyInfo) {
        unsafe {
            self.device.cmd_pipeline_barrier2(self.buffer, dependency_info);
        }
    }

    pub fn bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe {
            self.device.cmd_bind_pipeline(self.buffer, bind_point, pipeline);
        }
    }

    pub fn bind_vertex_buffers(&self, first_binding: u32, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.buffer, first_binding, buffers, offsets);
        }
    }

    pub fn bind_index_buffer(&self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        unsafe {
            self.device.cmd_bind_index_buffer(self.buffer, buffer, offset, index_type);
        }
    }

    pub fn set_viewport(&self, viewport: vk::Viewport) {
        unsafe {
            self.device.cmd_set_viewport(self.buffer, 0, std::slice::from_ref(&viewport));
        }
    }

    pub fn set_scissor(&self, scissor: vk::Rect2D) {
        unsafe {
            self.device.cmd_set_scissor(self.buffer, 0, std::slice::from_ref(&scissor));
        }
    }

    pub fn push_constants(&self, layout: vk::PipelineLayout, stages: vk::ShaderStageFlags, offset: u32, data: &[u8]) {
        unsafe {
            self.device.cmd_push_constants(self.buffer, layout, stages, offset, data);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw_indexed(
                self.buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }

    pub fn draw_indexed_indirect_count(
        &self,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        count_buffer: vk::Buffer,
        count_buffer_offset: vk::DeviceSize,
        max_draw_count: u32,
        stride: u32,
    ) {
        unsafe {
            self.device.cmd_draw_indexed_indirect_count(
                self.buffer,
                buffer,
                offset,
                count_buffer,
                count_buffer_offset,
                max_draw_count,
                stride,
            );
        }
    }

    pub fn dispatch(&self, x: u32, y: u32, z: u32) {
        unsafe {
            self.device.cmd_dispatch(self.buffer, x, y, z);
        }
    }

    pub fn fill_buffer(&self, buffer: vk::Buffer, offset: vk::DeviceSize, size: vk::DeviceSize, data: u32) {
        unsafe {
            self.device.cmd_fill_buffer(self.buffer, buffer, offset, size, data);
        }
    }
}

/// Owns a Vulkan queue handle plus one command pool with `frame_count`
/// command buffers — one slot per frame-in-flight, reset and re-recorded
/// every cycle (spec §4.5).
pub struct CommandQueue {
    device: Device,
    queue: vk::Queue,
    family_index: u32,
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
}

impl CommandQueue {
    pub fn new(device: Device, queue: vk::Queue, family_index: u32, frame_count: usize) -> Result<Self> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool =
            unsafe { device.create_command_pool(&pool_info, None) }.vk_ctx("creating command pool")?;

        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(frame_count as u32);
        let buffers = unsafe { device.allocate_command_buffers(&alloc_info) }
            .vk_ctx("allocating command buffers")?;

        Ok(Self {
            device,
            queue,
            family_index,
            pool,
            buffers,
        })
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn family_index(&self) -> u32 {
        self.family_index
    }

    /// Borrow the command buffer for frame slot `frame_index` as a
    /// recorder. A fresh `CommandBuffer` handle is cheap (it's a clone of
    /// `Device` plus the raw handle), so callers get one per call.
    pub fn command_buffer(&self, frame_index: usize) -> CommandBuffer {
        CommandBuffer::new(self.device.clone(), self.buffers[frame_index])
    }

    pub fn submit(&self, submit_infos: &[vk::SubmitInfo2], fence: vk::Fence) -> Result<()> {
        unsafe { self.device.queue_submit2(self.queue, submit_infos, fence) }
            .vk_ctx("submitting to queue")
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.pool, None);
        }
    }
}

//! Reusable vectors of external buffers/textures, created on demand and
//! handed back as stable `u32` handles (spec §4.10's table of buffer
//! types).

use ash::vk;
use bitflags::bitflags;

use crate::error::Result;
use crate::memory::MemoryManager;
use crate::resources::{Buffer, Texture};

/// Which `(memory_property, buffer_usage)` pair `create_external_buffer`
/// resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalBufferType {
    GpuOnly,
    CpuVisibleUniform,
    CpuVisibleSsbo,
}

impl ExternalBufferType {
    fn property_and_usage(self) -> (vk::MemoryPropertyFlags, vk::BufferUsageFlags) {
        match self {
            ExternalBufferType::GpuOnly => (
                vk::MemoryPropertyFlags::DEVICE_LOCAL,
                vk::BufferUsageFlags::STORAGE_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_DST
                    | vk::BufferUsageFlags::TRANSFER_SRC,
            ),
            ExternalBufferType::CpuVisibleUniform => (
                vk::MemoryPropertyFlags::HOST_COHERENT,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
            ),
            ExternalBufferType::CpuVisibleSsbo => (
                vk::MemoryPropertyFlags::HOST_COHERENT,
                vk::BufferUsageFlags::STORAGE_BUFFER,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalTextureType {
    RenderTarget,
    Depth,
    Stencil,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExternalTextureFlags: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const SAMPLE_TEXTURE = 1 << 2;
    }
}

/// Tracks the `(access, layout, stage)` triple an external texture was
/// last used with, so `transition_state` can seed a barrier from the true
/// previous state instead of assuming `UNDEFINED`.
#[derive(Clone, Copy)]
struct TextureState {
    access: vk::AccessFlags2,
    layout: vk::ImageLayout,
    stage: vk::PipelineStageFlags2,
}

pub struct ExternalTexture {
    texture: Texture,
    state: TextureState,
}

impl ExternalTexture {
    pub fn handle(&self) -> vk::Image {
        self.texture.handle()
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Seed a barrier builder from the previous state and record the new
    /// one atomically — the caller fills in the image/subresource range
    /// and records the barrier itself.
    pub fn transition_state(
        &mut self,
        new_access: vk::AccessFlags2,
        new_layout: vk::ImageLayout,
        new_stage: vk::PipelineStageFlags2,
    ) -> vk::ImageMemoryBarrier2Builder<'static> {
        let previous = self.state;
        self.state = TextureState {
            access: new_access,
            layout: new_layout,
            stage: new_stage,
        };
        vk::ImageMemoryBarrier2::builder()
            .src_stage_mask(previous.stage)
            .src_access_mask(previous.access)
            .dst_stage_mask(new_stage)
            .dst_access_mask(new_access)
            .old_layout(previous.layout)
            .new_layout(new_layout)
            .image(self.texture.handle())
    }
}

/// Owns reusable vectors of external buffers and textures. Handles handed
/// back to the application are indices into these vectors.
#[derive(Default)]
pub struct VkExternalResourceFactory {
    buffers: Vec<Buffer>,
    textures: Vec<ExternalTexture>,
}

impl VkExternalResourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_external_buffer(
        &mut self,
        device: ash::Device,
        memory: &mut MemoryManager,
        size: vk::DeviceSize,
        ty: ExternalBufferType,
    ) -> Result<u32> {
        let (property, usage) = ty.property_and_usage();
        let buffer = Buffer::new(device, memory, size, usage, property, &[])?;
        self.buffers.push(buffer);
        Ok((self.buffers.len() - 1) as u32)
    }

    pub fn create_external_texture(
        &mut self,
        device: ash::Device,
        memory: &mut MemoryManager,
        width: u32,
        height: u32,
        format: vk::Format,
        ty: ExternalTextureType,
        flags: ExternalTextureFlags,
    ) -> Result<u32> {
        let mut usage = match ty {
            ExternalTextureType::RenderTarget => vk::ImageUsageFlags::COLOR_ATTACHMENT,
            ExternalTextureType::Depth | ExternalTextureType::Stencil => {
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
            }
        };
        if flags.contains(ExternalTextureFlags::COPY_SRC) {
            usage |= vk::ImageUsageFlags::TRANSFER_SRC;
        }
        if flags.contains(ExternalTextureFlags::COPY_DST) {
            usage |= vk::ImageUsageFlags::TRANSFER_DST;
        }
        if flags.contains(ExternalTextureFlags::SAMPLE_TEXTURE) {
            usage |= vk::ImageUsageFlags::SAMPLED;
        }

        let texture = Texture::new(device, memory, width, height, 1, 1, format, usage, &[])?;
        self.textures.push(ExternalTexture {
            texture,
            state: TextureState {
                access: vk::AccessFlags2::empty(),
                layout: vk::ImageLayout::UNDEFINED,
                stage: vk::PipelineStageFlags2::TOP_OF_PIPE,
            },
        });
        Ok((self.textures.len() - 1) as u32)
    }

    pub fn buffer(&self, index: u32) -> &Buffer {
        &self.buffers[index as usize]
    }

    pub fn texture(&mut self, index: u32) -> &mut ExternalTexture {
        &mut self.textures[index as usize]
    }
}

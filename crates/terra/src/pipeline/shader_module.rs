//! SPIR-V shader module loading.

use std::ffi::CStr;
use std::fs;
use std::path::Path;

use ash::{vk, Device};

use crate::error::{Error, Result, VkResultExt};

/// An RAII-owned `VkShaderModule` loaded from a SPIR-V blob.
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    pub fn from_bytes(device: Device, bytes: &[u8]) -> Result<Self> {
        let (prefix, words, suffix) = unsafe { bytes.align_to::<u32>() };
        if !prefix.is_empty() || !suffix.is_empty() {
            return Err(Error::ShaderLoadFailure {
                path: "<bytes>".into(),
                reason: "SPIR-V bytecode is not 4-byte aligned".into(),
            });
        }
        let create_info = vk::ShaderModuleCreateInfo::builder().code(words);
        let module = unsafe { device.create_shader_module(&create_info, None) }
            .vk_ctx("creating shader module")?;
        Ok(Self { device, module })
    }

    pub fn from_file(device: Device, shader_root: &Path, relative_path: &str) -> Result<Self> {
        let path = shader_root.join(relative_path);
        let bytes = fs::read(&path).map_err(|e| Error::ShaderLoadFailure {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(device, &bytes)
    }

    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    pub fn stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        const ENTRY: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(ENTRY)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

//! Renderer configuration.
//!
//! Mirrors the teacher's `VulkanRendererConfig` / `core::config` pattern:
//! a plain serde-derived struct, loadable from RON or TOML, with a
//! `Default` impl giving sane values for development.

use serde::{Deserialize, Serialize};

/// Which of the three interchangeable render engine variants to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderEngineKind {
    /// Vertex-shader, one draw call per model.
    VsIndividual,
    /// Vertex-shader, GPU frustum-culled indirect draws.
    VsIndirect,
    /// Mesh-shader draws, one `vkCmdDrawMeshTasksEXT` per model bundle.
    MeshShader,
}

/// Top-level renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Application name passed to `VkApplicationInfo`.
    pub application_name: String,
    /// Number of frames kept in flight (`F` in the spec). Default 2.
    pub max_frames_in_flight: usize,
    /// Enable `VK_LAYER_KHRONOS_validation` and `VK_EXT_debug_utils`.
    pub enable_validation: bool,
    /// Root directory SPIR-V blob paths are resolved relative to.
    pub shader_root: String,
    /// Which render engine variant to instantiate.
    pub engine_kind: RenderEngineKind,
    /// Initial window extent.
    pub initial_width: u32,
    /// Initial window extent.
    pub initial_height: u32,
    /// Capacity of the bindless combined-image-sampler table.
    pub bindless_texture_capacity: u32,
    /// Initial byte budget for a freshly created device-memory pool.
    pub initial_pool_budget: u64,
    /// Minimum buddy-allocator block size in bytes.
    pub buddy_min_block_size: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "Terra".to_string(),
            max_frames_in_flight: 2,
            enable_validation: cfg!(debug_assertions),
            shader_root: "shaders".to_string(),
            engine_kind: RenderEngineKind::VsIndividual,
            initial_width: 1280,
            initial_height: 720,
            bindless_texture_capacity: 4096,
            initial_pool_budget: 64 * 1024 * 1024,
            buddy_min_block_size: 256,
        }
    }
}

impl RendererConfig {
    /// Parse a configuration from a RON string (the teacher's `ron`
    /// dependency, already used for its own `core::config`).
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_two_frames_in_flight() {
        assert_eq!(RendererConfig::default().max_frames_in_flight, 2);
    }

    #[test]
    fn round_trips_through_ron() {
        let cfg = RendererConfig::default();
        let text = ron::to_string(&cfg).unwrap();
        let parsed = RendererConfig::from_ron(&text).unwrap();
        assert_eq!(parsed.application_name, cfg.application_name);
    }
}

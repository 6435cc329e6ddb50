//! Crate-wide error type
//!
//! Every fallible Vulkan call in the crate is wrapped into one of these
//! variants with a human-readable context string, per the error handling
//! policy: init-time failures (extensions, layers, shaders) abort engine
//! construction, per-frame transient failures are handled by the caller.

use ash::vk;
use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the Terra rendering runtime.
#[derive(Error, Debug)]
pub enum Error {
    /// A raw Vulkan API call returned a non-success code.
    #[error("Vulkan API error in {context}: {code:?}")]
    Api {
        /// What the engine was doing when the call failed.
        context: String,
        /// The Vulkan result code.
        code: vk::Result,
    },

    /// A required instance or device extension is not advertised.
    #[error("required extension missing: {0}")]
    ExtensionMissing(String),

    /// A requested validation layer is not available on this instance.
    #[error("validation layer missing: {0}")]
    ValidationLayerMissing(String),

    /// No memory type satisfies the requested `(type_bits, property)` pair.
    #[error("no suitable memory type for requirements {type_bits:#x} / {properties:?}")]
    NoSuitableMemoryType {
        /// The requirements' memory type bitmask.
        type_bits: u32,
        /// The requested property flags.
        properties: vk::MemoryPropertyFlags,
    },

    /// The device reported `VK_ERROR_OUT_OF_DEVICE_MEMORY`.
    #[error("out of device memory allocating {requested} bytes: {context}")]
    OutOfDeviceMemory {
        /// Bytes requested at the time of failure.
        requested: u64,
        /// What was being allocated.
        context: String,
    },

    /// A fixed-size barrier builder received more barriers than it can hold.
    #[error("barrier overflow: {count} barriers exceeds capacity {capacity} in {context}")]
    BarrierOverflow {
        /// Barriers requested.
        count: usize,
        /// Builder capacity.
        capacity: usize,
        /// Which barrier group overflowed.
        context: String,
    },

    /// A SPIR-V blob could not be read or parsed.
    #[error("failed to load shader {path}: {reason}")]
    ShaderLoadFailure {
        /// Shader path relative to the configured shader root.
        path: String,
        /// Why loading failed.
        reason: String,
    },

    /// `vkCreate*Pipelines` returned a non-success code.
    #[error("pipeline build failed: {0}")]
    PipelineBuildFailure(String),

    /// The swapchain was invalidated and must be recreated.
    #[error("swapchain lost: {0}")]
    SwapchainLost(String),

    /// A handle referenced a slot that no longer exists (freed or stale generation).
    #[error("stale or unknown handle in {0}")]
    InvalidHandle(&'static str),

    /// Catch-all for precondition violations that are programmer errors, not
    /// recoverable runtime conditions (e.g. mutating a live topology without
    /// a prior `device_wait_idle`).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl Error {
    /// Wrap a raw `vk::Result` with context, the crate's standard idiom for
    /// `.map_err(|e| Error::api("creating buffer", e))`.
    pub fn api(context: impl Into<String>, code: vk::Result) -> Self {
        Self::Api {
            context: context.into(),
            code,
        }
    }
}

/// Extension trait mirroring the teacher's `.map_err(VulkanError::Api)` idiom
/// but with an attached context string.
pub(crate) trait VkResultExt<T> {
    fn vk_ctx(self, context: &str) -> Result<T>;
}

impl<T> VkResultExt<T> for std::result::Result<T, vk::Result> {
    fn vk_ctx(self, context: &str) -> Result<T> {
        self.map_err(|code| Error::api(context, code))
    }
}

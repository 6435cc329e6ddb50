//! Shared-buffer allocators (spec §4.3): many logical sub-allocations
//! multiplexed into one Vulkan buffer, with relocation-on-grow semantics
//! that differ for device-local vs host-visible backing memory.

mod cpu;
mod free_list;
mod gpu;

pub use cpu::SharedBufferCpu;
pub use free_list::FreeListAllocator;
pub use gpu::{SharedBufferData, SharedBufferGpu};

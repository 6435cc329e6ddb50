//! Device memory allocator: buddy-suballocated pools over Vulkan heaps.
//!
//! Grounded on the teacher's `buffer.rs`/`context.rs` manual
//! `find_memory_type` + `vkAllocateMemory`/`vkBindBufferMemory` sequence,
//! generalized into a reusable pooled allocator per `spec.md` §4.1–§4.2.

mod buddy;
mod manager;
mod pool;

pub use buddy::BuddyAllocator;
pub use manager::{Allocation, MemoryManager};
pub use pool::{DeviceMemoryPool, PoolClass};

//! Per-frame command-queue scheduling: timeline/binary semaphores, fences,
//! and the submission builder tying transfer -> (compute) -> graphics ->
//! present together (spec §4.5).

mod fence;
mod queue;
mod semaphore;
mod submission;

pub use fence::Fence;
pub use queue::{CommandBuffer, CommandQueue};
pub use semaphore::{BinarySemaphore, TimelineSemaphore};
pub use submission::{SignalOp, SubmitDescription, WaitOp};

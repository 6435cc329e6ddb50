//! Staging/upload pipeline (spec §4.4): CPU -> GPU copies plus the
//! queue-ownership-transfer barriers needed when the transfer queue's
//! family differs from the consuming queue's family.

mod manager;
mod temporary_data;

pub use manager::StagingBufferManager;
pub use temporary_data::{TemporaryDataBuffer, TemporaryDataState};

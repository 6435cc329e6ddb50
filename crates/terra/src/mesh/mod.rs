//! Mesh managers (spec §4.9): per-engine-variant shared-buffer geometry
//! storage, uploaded once and referenced by many model instances.

mod bundle;
mod mesh_shader;
mod vs_individual;
mod vs_indirect;

pub use bundle::{MsMeshBundle, VsMeshBundle};
pub use mesh_shader::{MeshManagerMs, MeshUploadOffsets};
pub use vs_individual::MeshManagerVsIndividual;
pub use vs_indirect::{GpuAabb, MeshManagerVsIndirect};

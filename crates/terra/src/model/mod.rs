//! Model managers (spec §4.9): per-instance draw data and per-variant draw
//! recording, paired one-to-one with a `mesh::MeshManager*` that owns the
//! geometry being drawn.

mod bundle;
mod container;
mod mesh_shader;
mod vs_individual;
mod vs_indirect;

pub use bundle::{ModelBundle, ModelBundleContainer};
pub use container::{Model, ModelContainer};
pub use mesh_shader::ModelManagerMeshShader;
pub use vs_individual::{GpuModelData, ModelManagerVsIndividual};
pub use vs_indirect::{GpuDrawIndexedIndirectCommand, ModelManagerVsIndirect};

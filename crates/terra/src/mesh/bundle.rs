//! Uploaded mesh bundle records (spec §4.9): where a mesh's geometry lives
//! inside the shared buffers owned by its `MeshManager*` variant.

use slotmap::SlotMap;

use crate::foundation::Aabb;
use crate::handles::MeshBundleKey;

/// Geometry location for the VS-individual and VS-indirect variants: a
/// contiguous run inside the shared vertex buffer and shared index buffer.
#[derive(Clone, Copy)]
pub struct VsMeshBundle {
    pub vertex_offset: i32,
    pub first_index: u32,
    pub index_count: u32,
    /// Object-space bounding box; VS-indirect transforms this per-model on
    /// the GPU during the culling compute pass.
    pub aabb: Aabb,
}

/// Geometry location for the mesh-shader variant: offsets into the four
/// shared buffers `MeshManagerMS` owns (vertices, vertex-indices,
/// primitive-indices, meshlet descriptors).
#[derive(Clone, Copy)]
pub struct MsMeshBundle {
    pub meshlet_offset: u32,
    pub meshlet_count: u32,
    pub aabb: Aabb,
}

#[derive(Default)]
pub struct VsMeshBundleContainer {
    bundles: SlotMap<MeshBundleKey, VsMeshBundle>,
}

impl VsMeshBundleContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bundle: VsMeshBundle) -> MeshBundleKey {
        self.bundles.insert(bundle)
    }

    pub fn remove(&mut self, key: MeshBundleKey) -> Option<VsMeshBundle> {
        self.bundles.remove(key)
    }

    pub fn get(&self, key: MeshBundleKey) -> Option<&VsMeshBundle> {
        self.bundles.get(key)
    }
}

#[derive(Default)]
pub struct MsMeshBundleContainer {
    bundles: SlotMap<MeshBundleKey, MsMeshBundle>,
}

impl MsMeshBundleContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bundle: MsMeshBundle) -> MeshBundleKey {
        self.bundles.insert(bundle)
    }

    pub fn remove(&mut self, key: MeshBundleKey) -> Option<MsMeshBundle> {
        self.bundles.remove(key)
    }

    pub fn get(&self, key: MeshBundleKey) -> Option<&MsMeshBundle> {
        self.bundles.get(key)
    }
}

//! Stable-handle storage for live models (spec §4.9).

use slotmap::SlotMap;

use crate::foundation::math::Transform;
use crate::handles::{MeshBundleKey, ModelKey};

/// One instance: a transform plus the mesh bundle it draws from.
pub struct Model {
    pub transform: Transform,
    pub mesh_bundle: MeshBundleKey,
    pub mesh_index: u32,
    pub visible: bool,
}

/// A generational arena of [`Model`]s. Removing a model invalidates its
/// [`ModelKey`]; slotmap detects stale keys instead of letting them
/// silently alias a reused slot.
#[derive(Default)]
pub struct ModelContainer {
    models: SlotMap<ModelKey, Model>,
}

impl ModelContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: Model) -> ModelKey {
        self.models.insert(model)
    }

    pub fn remove(&mut self, key: ModelKey) -> Option<Model> {
        self.models.remove(key)
    }

    pub fn get(&self, key: ModelKey) -> Option<&Model> {
        self.models.get(key)
    }

    pub fn get_mut(&mut self, key: ModelKey) -> Option<&mut Model> {
        self.models.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelKey, &Model)> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

//! Model bundles (spec §4.9): a draw-grouping of model instances that
//! share a mesh and are iterated together under one pipeline bind.

use slotmap::SlotMap;

use crate::handles::{ModelBundleKey, ModelKey};

/// An ordered set of model instances drawn together. Order is significant:
/// `PipelineDetails::pipeline_local_indices` indexes into this list.
#[derive(Default)]
pub struct ModelBundle {
    models: Vec<ModelKey>,
}

impl ModelBundle {
    pub fn push(&mut self, model: ModelKey) {
        self.models.push(model);
    }

    pub fn remove(&mut self, model: ModelKey) {
        self.models.retain(|m| *m != model);
    }

    pub fn models(&self) -> &[ModelKey] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[derive(Default)]
pub struct ModelBundleContainer {
    bundles: SlotMap<ModelBundleKey, ModelBundle>,
}

impl ModelBundleContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bundle: ModelBundle) -> ModelBundleKey {
        self.bundles.insert(bundle)
    }

    pub fn get(&self, key: ModelBundleKey) -> Option<&ModelBundle> {
        self.bundles.get(key)
    }

    pub fn get_mut(&mut self, key: ModelBundleKey) -> Option<&mut ModelBundle> {
        self.bundles.get_mut(key)
    }

    pub fn remove(&mut self, key: ModelBundleKey) -> Option<ModelBundle> {
        self.bundles.remove(key)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ModelBundle> {
        self.bundles.values_mut()
    }
}

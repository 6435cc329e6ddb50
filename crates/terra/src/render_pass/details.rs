//! `PipelineDetails` (spec §4.9): the record a `ModelManager*` walks to
//! issue per-pipeline draws without re-deriving which models use which
//! pipeline every frame.

use crate::handles::{ModelBundleKey, ModelKey, PipelineKey};
use crate::model::{Model, ModelBundleContainer, ModelContainer};

/// One pipeline's worth of draw work: the model bundles that contain at
/// least one model bound to `pipeline_global`, paired with the local
/// indices (inside each bundle) of the models that actually use it.
pub struct PipelineDetails {
    pub pipeline_global: PipelineKey,
    pub model_bundle_indices: Vec<ModelBundleKey>,
    pub pipeline_local_indices: Vec<Vec<u32>>,
}

impl PipelineDetails {
    pub fn new(pipeline_global: PipelineKey) -> Self {
        Self {
            pipeline_global,
            model_bundle_indices: Vec::new(),
            pipeline_local_indices: Vec::new(),
        }
    }

    pub fn push_bundle(&mut self, bundle: ModelBundleKey, local_indices: Vec<u32>) {
        self.model_bundle_indices.push(bundle);
        self.pipeline_local_indices.push(local_indices);
    }

    /// Walk `(bundle, local_index) -> model` for every model this pipeline
    /// must draw this frame.
    pub fn iter_models<'a>(
        &'a self,
        bundles: &'a ModelBundleContainer,
        models: &'a ModelContainer,
    ) -> impl Iterator<Item = (ModelKey, &'a Model)> + 'a {
        self.model_bundle_indices
            .iter()
            .zip(self.pipeline_local_indices.iter())
            .filter_map(move |(bundle_key, locals)| bundles.get(*bundle_key).map(|b| (b, locals)))
            .flat_map(move |(bundle, locals)| {
                locals.iter().filter_map(move |&local| {
                    bundle.models().get(local as usize).and_then(|&key| models.get(key).map(|m| (key, m)))
                })
            })
    }
}

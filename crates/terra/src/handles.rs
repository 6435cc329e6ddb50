//! Stable handles into reusable vectors.
//!
//! The source repo uses `unique_ptr`/`shared_ptr` to hand out stable
//! pointers into vectors that otherwise get compacted and moved around.
//! We replace that with `slotmap`: a generational arena plus a small
//! `Key` type. Holding a handle past a `remove()` is then a detectable
//! error (the key's generation no longer matches) instead of a dangling
//! pointer.

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a live `Model` inside a `ModelContainer`.
    pub struct ModelKey;

    /// Handle to a registered `ExternalGraphicsPipeline` description.
    pub struct PipelineKey;

    /// Handle to a bound texture (the `u32` the `Renderer` API hands back
    /// from `bind_texture` is this key's slot index).
    pub struct TextureKey;

    /// Handle to an uploaded VS or MS mesh bundle.
    pub struct MeshBundleKey;

    /// Handle to a model bundle (a draw-grouping of model instances).
    pub struct ModelBundleKey;

    /// Handle to an application-defined camera.
    pub struct CameraKey;

    /// Handle to an external render pass.
    pub struct RenderPassKey;

    /// Handle to an external buffer created through the resource factory.
    pub struct ExternalBufferKey;

    /// Handle to an external texture created through the resource factory.
    pub struct ExternalTextureKey;
}

//! Generic pipeline cache: one reusable vector of pipeline+description
//! pairs, shared between the graphics and compute variants by the
//! description type `T` (spec §4.7).

use ash::{vk, Device};

use crate::error::Result;

/// One live pipeline slot. `overwritable` marks a slot whose pipeline has
/// been invalidated (its description still describes what *was* there) so
/// the next `add_or_get` may reuse the slot instead of growing the vector.
struct Slot<T> {
    description: T,
    pipeline: vk::Pipeline,
    overwritable: bool,
}

/// Holds one `VkPipelineLayout` and every pipeline built against it, keyed
/// by value-equal descriptions so repeated `add_or_get` calls with the same
/// description are free after the first.
pub struct PipelineManager<T> {
    device: Device,
    layout: vk::PipelineLayout,
    shader_root: std::path::PathBuf,
    slots: Vec<Slot<T>>,
}

impl<T: PartialEq + Clone> PipelineManager<T> {
    pub fn new(device: Device, layout: vk::PipelineLayout, shader_root: std::path::PathBuf) -> Self {
        Self {
            device,
            layout,
            shader_root,
            slots: Vec::new(),
        }
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    pub fn shader_root(&self) -> &std::path::Path {
        &self.shader_root
    }

    pub fn set_shader_root(&mut self, root: std::path::PathBuf) {
        self.shader_root = root;
    }

    pub fn pipeline(&self, index: usize) -> vk::Pipeline {
        self.slots[index].pipeline
    }

    /// Scan existing slots for one whose description equals `description`;
    /// on miss, build via `build_fn` and either overwrite the first
    /// `overwritable` slot or append a new one.
    pub fn add_or_get(
        &mut self,
        description: T,
        build_fn: impl FnOnce(&Device, vk::PipelineLayout, &std::path::Path) -> Result<vk::Pipeline>,
    ) -> Result<usize> {
        if let Some(index) = self.slots.iter().position(|s| s.description == description) {
            return Ok(index);
        }

        let pipeline = build_fn(&self.device, self.layout, &self.shader_root)?;

        if let Some(index) = self.slots.iter().position(|s| s.overwritable) {
            unsafe {
                self.device.destroy_pipeline(self.slots[index].pipeline, None);
            }
            self.slots[index] = Slot {
                description,
                pipeline,
                overwritable: false,
            };
            return Ok(index);
        }

        self.slots.push(Slot {
            description,
            pipeline,
            overwritable: false,
        });
        Ok(self.slots.len() - 1)
    }

    /// Mark a slot unavailable for direct use but eligible for reuse by the
    /// next `add_or_get` miss, without shrinking the vector (stable indices
    /// for anything still holding this slot's index elsewhere).
    pub fn set_overwritable(&mut self, index: usize) {
        self.slots[index].overwritable = true;
    }

    /// Rebuild every live (non-overwritable) pipeline against the current
    /// layout and shader root — used after a shader-root change.
    pub fn recreate_all(
        &mut self,
        build_fn: impl Fn(&T, &Device, vk::PipelineLayout, &std::path::Path) -> Result<vk::Pipeline>,
    ) -> Result<()> {
        for slot in &mut self.slots {
            if slot.overwritable {
                continue;
            }
            let new_pipeline = build_fn(&slot.description, &self.device, self.layout, &self.shader_root)?;
            unsafe {
                self.device.destroy_pipeline(slot.pipeline, None);
            }
            slot.pipeline = new_pipeline;
        }
        Ok(())
    }
}

impl<T> Drop for PipelineManager<T> {
    fn drop(&mut self) {
        unsafe {
            for slot in &self.slots {
                self.device.destroy_pipeline(slot.pipeline, None);
            }
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq)]
    struct Dummy(u32);

    #[test]
    fn slot_reuse_prefers_overwritable_before_growing() {
        // Pure bookkeeping check independent of any device call.
        let mut slots: Vec<Slot<Dummy>> = vec![
            Slot { description: Dummy(1), pipeline: vk::Pipeline::null(), overwritable: false },
            Slot { description: Dummy(2), pipeline: vk::Pipeline::null(), overwritable: true },
        ];
        let reuse = slots.iter().position(|s| s.overwritable);
        assert_eq!(reuse, Some(1));
        slots[1] = Slot { description: Dummy(3), pipeline: vk::Pipeline::null(), overwritable: false };
        assert!(slots.iter().position(|s| s.description == Dummy(3)).is_some());
    }
}

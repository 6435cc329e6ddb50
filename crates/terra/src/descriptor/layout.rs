//! Descriptor set layouts and pipeline layouts sized for the descriptor
//! buffer extension (`VK_EXT_descriptor_buffer`), rather than classic
//! descriptor pools/sets.

use ash::extensions::ext::DescriptorBuffer as DescriptorBufferExt;
use ash::{vk, Device};

use crate::error::{Result, VkResultExt};

/// Builds one `VkDescriptorSetLayout` tagged `DESCRIPTOR_BUFFER_BIT_EXT`.
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl Default for DescriptorSetLayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorSetLayoutBuilder {
    pub fn new() -> Self {
        Self { bindings: Vec::new() }
    }

    /// Append a binding. `slot` is the binding index within the set;
    /// `ty`/`count`/`stages` mirror `VkDescriptorSetLayoutBinding` fields.
    pub fn add_binding(
        mut self,
        slot: u32,
        ty: vk::DescriptorType,
        count: u32,
        stages: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(slot)
                .descriptor_type(ty)
                .descriptor_count(count)
                .stage_flags(stages)
                .build(),
        );
        self
    }

    pub fn build(
        self,
        device: &Device,
        ext: &DescriptorBufferExt,
    ) -> Result<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder()
            .flags(vk::DescriptorSetLayoutCreateFlags::DESCRIPTOR_BUFFER_EXT)
            .bindings(&self.bindings);
        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None) }
            .vk_ctx("creating descriptor buffer set layout")?;

        let size = unsafe { ext.get_descriptor_set_layout_size(layout) };
        let binding_offsets = self
            .bindings
            .iter()
            .map(|b| unsafe { ext.get_descriptor_set_layout_binding_offset(layout, b.binding) })
            .collect();

        Ok(DescriptorSetLayout {
            device: device.clone(),
            layout,
            bindings: self.bindings,
            binding_offsets,
            size,
        })
    }
}

/// A descriptor-buffer-compatible set layout, carrying the per-binding byte
/// offset and total size the extension reports for it.
pub struct DescriptorSetLayout {
    device: Device,
    layout: vk::DescriptorSetLayout,
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
    binding_offsets: Vec<vk::DeviceSize>,
    size: vk::DeviceSize,
}

impl DescriptorSetLayout {
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Byte offset of `slot` within this set's descriptor buffer region.
    pub fn binding_offset(&self, slot: u32) -> vk::DeviceSize {
        let index = self
            .bindings
            .iter()
            .position(|b| b.binding == slot)
            .expect("unknown binding slot");
        self.binding_offsets[index]
    }

    pub fn descriptor_type(&self, slot: u32) -> vk::DescriptorType {
        self.bindings
            .iter()
            .find(|b| b.binding == slot)
            .expect("unknown binding slot")
            .descriptor_type
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Owns a `VkPipelineLayout` built from an ordered list of descriptor set
/// layouts plus push-constant ranges.
pub struct PipelineLayout {
    device: Device,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    pub fn new(
        device: Device,
        set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> Result<Self> {
        let create_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(set_layouts)
            .push_constant_ranges(push_constant_ranges);
        let layout = unsafe { device.create_pipeline_layout(&create_info, None) }
            .vk_ctx("creating pipeline layout")?;
        Ok(Self { device, layout })
    }

    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

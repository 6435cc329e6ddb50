//! Descriptor buffers (`VK_EXT_descriptor_buffer`) and pipeline layouts
//! (spec §4.6). Terra never allocates classic `VkDescriptorPool`/
//! `VkDescriptorSet` objects; every binding slot lives at a byte offset
//! inside one buffer bound with `vkCmdSetDescriptorBufferOffsetsEXT`.

mod buffer;
mod layout;

pub use buffer::DescriptorBuffer;
pub use layout::{DescriptorSetLayout, DescriptorSetLayoutBuilder, PipelineLayout};

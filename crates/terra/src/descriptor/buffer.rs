//! The descriptor buffer itself: one host-coherent `VkBuffer` holding K
//! sets' worth of descriptor-buffer-extension payloads back to back
//! (spec §4.6).

use ash::extensions::ext::DescriptorBuffer as DescriptorBufferExt;
use ash::{vk, Device};

use crate::error::{Result, VkResultExt};
use crate::memory::MemoryManager;
use crate::resources::Buffer;

use super::layout::DescriptorSetLayout;

/// Owns K descriptor set layouts and the single buffer their descriptor
/// payloads are written into. `create_buffer` sizes the buffer as the sum
/// of every layout's reported size; `recreate_buffer` preserves the
/// previous bytes when the new allocation is at least as large.
pub struct DescriptorBuffer {
    device: Device,
    ext: DescriptorBufferExt,
    layouts: Vec<DescriptorSetLayout>,
    layout_offsets: Vec<vk::DeviceSize>,
    buffer: Option<Buffer>,
    properties: vk::PhysicalDeviceDescriptorBufferPropertiesEXT,
}

impl DescriptorBuffer {
    pub fn new(
        device: Device,
        ext: DescriptorBufferExt,
        layouts: Vec<DescriptorSetLayout>,
        properties: vk::PhysicalDeviceDescriptorBufferPropertiesEXT,
    ) -> Self {
        Self {
            device,
            ext,
            layouts,
            layout_offsets: Vec::new(),
            buffer: None,
            properties,
        }
    }

    pub fn set_layouts(&self) -> Vec<vk::DescriptorSetLayout> {
        self.layouts.iter().map(DescriptorSetLayout::handle).collect()
    }

    fn total_size(&self) -> vk::DeviceSize {
        self.layouts.iter().map(DescriptorSetLayout::size).sum()
    }

    /// Allocate a fresh host-coherent buffer sized to the sum of every
    /// layout's size, and record each layout's starting byte offset.
    pub fn create_buffer(&mut self, memory: &mut MemoryManager) -> Result<()> {
        let size = self.total_size().max(1);
        let usage = vk::BufferUsageFlags::RESOURCE_DESCRIPTOR_BUFFER_EXT
            | vk::BufferUsageFlags::SAMPLER_DESCRIPTOR_BUFFER_EXT;
        let buffer = Buffer::new(
            self.device.clone(),
            memory,
            size,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            &[],
        )?;
        self.layout_offsets = self.compute_offsets();
        self.buffer = Some(buffer);
        Ok(())
    }

    fn compute_offsets(&self) -> Vec<vk::DeviceSize> {
        let mut offsets = Vec::with_capacity(self.layouts.len());
        let mut running = 0;
        for layout in &self.layouts {
            offsets.push(running);
            running += layout.size();
        }
        offsets
    }

    /// Allocate a new buffer of the current total size. If it is at least
    /// as large as the previous one, copies the old bytes forward;
    /// otherwise the caller must re-issue every descriptor write.
    pub fn recreate_buffer(&mut self, memory: &mut MemoryManager) -> Result<bool> {
        let old = self.buffer.take();
        let old_size = old.as_ref().map(Buffer::size).unwrap_or(0);
        self.create_buffer(memory)?;
        let new_size = self.buffer.as_ref().expect("just created").size();

        let preserved = new_size >= old_size;
        if preserved {
            if let (Some(old), Some(new_ptr)) =
                (old, self.buffer.as_ref().and_then(Buffer::mapped_ptr))
            {
                if let Some(old_ptr) = old.mapped_ptr() {
                    unsafe {
                        std::ptr::copy_nonoverlapping(old_ptr, new_ptr, old_size as usize);
                    }
                }
            }
        }
        Ok(preserved)
    }

    fn mapped_ptr(&self) -> *mut u8 {
        self.buffer
            .as_ref()
            .and_then(Buffer::mapped_ptr)
            .expect("descriptor buffer must be host-visible")
    }

    pub fn device_address(&self) -> vk::DeviceAddress {
        self.buffer.as_ref().expect("create_buffer not called").device_address()
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer.as_ref().expect("create_buffer not called").handle()
    }

    fn descriptor_size(&self, ty: vk::DescriptorType) -> vk::DeviceSize {
        match ty {
            vk::DescriptorType::UNIFORM_BUFFER => self.properties.uniform_buffer_descriptor_size,
            vk::DescriptorType::STORAGE_BUFFER => self.properties.storage_buffer_descriptor_size,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER => {
                self.properties.combined_image_sampler_descriptor_size
            }
            vk::DescriptorType::SAMPLED_IMAGE => self.properties.sampled_image_descriptor_size,
            _ => panic!("unsupported descriptor type for sizing: {ty:?}"),
        }
    }

    fn target_address(&self, set: usize, slot: u32, index: u32, ty: vk::DescriptorType) -> *mut u8 {
        let offset = self.layout_offsets[set]
            + self.layouts[set].binding_offset(slot)
            + vk::DeviceSize::from(index) * self.descriptor_size(ty);
        unsafe { self.mapped_ptr().add(offset as usize) }
    }

    pub fn set_uniform_buffer_descriptor(
        &self,
        set: usize,
        slot: u32,
        index: u32,
        address: vk::DeviceAddress,
        range: vk::DeviceSize,
    ) {
        let addr_info = vk::DescriptorAddressInfoEXT::builder().address(address).range(range);
        let data = vk::DescriptorDataEXT {
            p_uniform_buffer: &*addr_info as *const _,
        };
        self.write_descriptor(set, slot, index, vk::DescriptorType::UNIFORM_BUFFER, data);
    }

    pub fn set_storage_buffer_descriptor(
        &self,
        set: usize,
        slot: u32,
        index: u32,
        address: vk::DeviceAddress,
        range: vk::DeviceSize,
    ) {
        let addr_info = vk::DescriptorAddressInfoEXT::builder().address(address).range(range);
        let data = vk::DescriptorDataEXT {
            p_storage_buffer: &*addr_info as *const _,
        };
        self.write_descriptor(set, slot, index, vk::DescriptorType::STORAGE_BUFFER, data);
    }

    pub fn set_combined_image_descriptor(
        &self,
        set: usize,
        slot: u32,
        index: u32,
        image_view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    ) {
        let image_info = vk::DescriptorImageInfo {
            sampler,
            image_view,
            image_layout: layout,
        };
        let data = vk::DescriptorDataEXT {
            p_combined_image_sampler: &image_info as *const _,
        };
        self.write_descriptor(
            set,
            slot,
            index,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            data,
        );
    }

    fn write_descriptor(
        &self,
        set: usize,
        slot: u32,
        index: u32,
        ty: vk::DescriptorType,
        data: vk::DescriptorDataEXT,
    ) {
        let size = self.descriptor_size(ty);
        let info = vk::DescriptorGetInfoEXT::builder().ty(ty).data(data);
        let dst = self.target_address(set, slot, index, ty);
        unsafe {
            self.ext
                .get_descriptor(&info, size as usize, dst.cast::<std::ffi::c_void>());
        }
    }

    /// Record the binding info and per-set offsets for a draw or dispatch
    /// referencing `set_count` consecutive sets starting at 0. `pipeline_layout`
    /// must be the layout the bound pipeline was built with — it determines
    /// which set layouts the offsets bind against, so `VK_NULL_HANDLE` here
    /// is invalid usage.
    pub fn bind(
        &self,
        cmd: vk::CommandBuffer,
        pipeline_layout: vk::PipelineLayout,
        bind_point: vk::PipelineBindPoint,
        set_count: usize,
    ) {
        let binding_info = vk::DescriptorBufferBindingInfoEXT::builder()
            .address(self.device_address())
            .usage(
                vk::BufferUsageFlags::RESOURCE_DESCRIPTOR_BUFFER_EXT
                    | vk::BufferUsageFlags::SAMPLER_DESCRIPTOR_BUFFER_EXT,
            )
            .build();
        unsafe {
            self.ext.cmd_bind_descriptor_buffers(cmd, std::slice::from_ref(&binding_info));
        }

        let buffer_indices: Vec<u32> = (0..set_count as u32).map(|_| 0).collect();
        let offsets = &self.layout_offsets[..set_count];
        unsafe {
            self.ext.cmd_set_descriptor_buffer_offsets(
                cmd,
                bind_point,
                pipeline_layout,
                0,
                &buffer_indices,
                offsets,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_cumulative_layout_sizes() {
        // Pure arithmetic check mirroring compute_offsets without a device.
        fn offsets(sizes: &[vk::DeviceSize]) -> Vec<vk::DeviceSize> {
            let mut out = Vec::with_capacity(sizes.len());
            let mut running = 0;
            for &s in sizes {
                out.push(running);
                running += s;
            }
            out
        }
        assert_eq!(offsets(&[64, 128, 32]), vec![0, 64, 192]);
    }
}

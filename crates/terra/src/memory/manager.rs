//! Memory manager: owns all device-memory pools and hands out [`Allocation`]s.

use std::cell::RefCell;
use std::rc::Rc;

use ash::{vk, Device, Instance};

use crate::error::{Error, Result, VkResultExt};

use super::buddy::BuddyAllocator;
use super::pool::{DeviceMemoryPool, PoolClass};

/// A live suballocation returned by [`MemoryManager::allocate_for_buffer`] or
/// [`MemoryManager::allocate_for_image`].
///
/// `valid` marks a moved-from allocation: [`Allocation::release`] takes the
/// value early (e.g. to hand ownership to a resource wrapper's `Drop`
/// elsewhere) without double-freeing the buddy block when this struct itself
/// is later dropped.
pub struct Allocation {
    pub gpu_offset: vk::DeviceSize,
    pub cpu_offset: Option<*mut u8>,
    pub size: vk::DeviceSize,
    pub alignment: vk::DeviceSize,
    pub memory: vk::DeviceMemory,
    pub memory_id: u16,
    valid: bool,
    buddy: Rc<RefCell<BuddyAllocator>>,
}

impl Allocation {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Consume the allocation without releasing its backing block — used
    /// when ownership is being transferred to something else that will
    /// call back into the manager to free it explicitly.
    pub fn release(mut self) {
        self.valid = false;
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        if self.valid {
            self.buddy
                .borrow_mut()
                .deallocate(self.gpu_offset, self.size, self.alignment);
        }
    }
}

/// The top-level allocator: keyed pools of CPU and GPU memory, selected per
/// requirement, grown on demand.
pub struct MemoryManager {
    device: Device,
    instance: Instance,
    physical_device: vk::PhysicalDevice,
    cpu_pools: Vec<DeviceMemoryPool>,
    gpu_pools: Vec<DeviceMemoryPool>,
    initial_budget: u64,
    min_block_size: u64,
}

fn next_pow2(mut v: u64) -> u64 {
    if v <= 1 {
        return 1;
    }
    v -= 1;
    v |= v >> 1;
    v |= v >> 2;
    v |= v >> 4;
    v |= v >> 8;
    v |= v >> 16;
    v |= v >> 32;
    v + 1
}

fn find_memory_type_index(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    type_bits: u32,
    property: vk::MemoryPropertyFlags,
) -> Result<u32> {
    let props = unsafe { instance.get_physical_device_memory_properties(physical_device) };
    for i in 0..props.memory_type_count {
        let bit_set = (type_bits & (1 << i)) != 0;
        let supports = props.memory_types[i as usize].property_flags.contains(property);
        if bit_set && supports {
            return Ok(i);
        }
    }
    Err(Error::NoSuitableMemoryType {
        type_bits,
        properties: property,
    })
}

impl MemoryManager {
    pub fn new(
        device: Device,
        instance: Instance,
        physical_device: vk::PhysicalDevice,
        initial_budget: u64,
        min_block_size: u64,
    ) -> Self {
        Self {
            device,
            instance,
            physical_device,
            cpu_pools: Vec::new(),
            gpu_pools: Vec::new(),
            initial_budget,
            min_block_size,
        }
    }

    fn class_for(property: vk::MemoryPropertyFlags) -> PoolClass {
        if property.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
            PoolClass::Cpu
        } else {
            PoolClass::Gpu
        }
    }

    fn pools_mut(&mut self, class: PoolClass) -> &mut Vec<DeviceMemoryPool> {
        match class {
            PoolClass::Cpu => &mut self.cpu_pools,
            PoolClass::Gpu => &mut self.gpu_pools,
        }
    }

    /// Encode `(class, index)` into the 16-bit `memory_id` the spec calls for.
    fn encode_id(class: PoolClass, index: usize) -> u16 {
        debug_assert!(index < 0x8000);
        let high_bit = match class {
            PoolClass::Cpu => 0x0000,
            PoolClass::Gpu => 0x8000,
        };
        high_bit | (index as u16)
    }

    fn decode_id(id: u16) -> (PoolClass, usize) {
        let class = if id & 0x8000 != 0 { PoolClass::Gpu } else { PoolClass::Cpu };
        (class, (id & 0x7fff) as usize)
    }

    /// Core allocation algorithm from spec §4.2, independent of the resource
    /// kind being bound.
    fn allocate(
        &mut self,
        requirements: vk::MemoryRequirements,
        property: vk::MemoryPropertyFlags,
    ) -> Result<Allocation> {
        let memory_type_index = find_memory_type_index(
            &self.instance,
            self.physical_device,
            requirements.memory_type_bits,
            property,
        )?;
        let class = Self::class_for(property);

        let pools = self.pools_mut(class);
        for (index, pool) in pools.iter().enumerate() {
            if pool.memory_type_index() != memory_type_index {
                continue;
            }
            if let Some((offset, cpu_ptr, buddy)) =
                pool.try_allocate(requirements.size, requirements.alignment)
            {
                return Ok(Allocation {
                    gpu_offset: offset,
                    cpu_offset: cpu_ptr,
                    size: requirements.size,
                    alignment: requirements.alignment,
                    memory: pool.handle(),
                    memory_id: Self::encode_id(class, index),
                    valid: true,
                    buddy,
                });
            }
        }

        // No pool had room: create a new one.
        let pool_size = self.initial_budget.max(next_pow2(requirements.size));
        let pool = DeviceMemoryPool::new(
            self.device.clone(),
            pool_size,
            memory_type_index,
            class,
            self.min_block_size,
        )?;
        let (offset, cpu_ptr, buddy) = pool
            .try_allocate(requirements.size, requirements.alignment)
            .expect("freshly created pool must satisfy its own sizing requirement");

        let pools = self.pools_mut(class);
        pools.push(pool);
        let index = pools.len() - 1;
        let memory = pools[index].handle();

        Ok(Allocation {
            gpu_offset: offset,
            cpu_offset: cpu_ptr,
            size: requirements.size,
            alignment: requirements.alignment,
            memory,
            memory_id: Self::encode_id(class, index),
            valid: true,
            buddy,
        })
    }

    /// Allocate and bind memory for a buffer (spec §4.2 step 5).
    pub fn allocate_for_buffer(
        &mut self,
        buffer: vk::Buffer,
        property: vk::MemoryPropertyFlags,
    ) -> Result<Allocation> {
        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };
        let allocation = self.allocate(requirements, property)?;
        unsafe {
            self.device
                .bind_buffer_memory(buffer, allocation.memory, allocation.gpu_offset)
        }
        .vk_ctx("binding buffer memory")?;
        Ok(allocation)
    }

    /// Allocate and bind memory for an image (spec §4.2 step 5).
    pub fn allocate_for_image(
        &mut self,
        image: vk::Image,
        property: vk::MemoryPropertyFlags,
    ) -> Result<Allocation> {
        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        let allocation = self.allocate(requirements, property)?;
        unsafe {
            self.device
                .bind_image_memory(image, allocation.memory, allocation.gpu_offset)
        }
        .vk_ctx("binding image memory")?;
        Ok(allocation)
    }

    /// Total free bytes across every pool of `(class, memory_id)` — mostly
    /// useful for tests and diagnostics.
    pub fn pool_available_size(&self, memory_id: u16) -> Option<u64> {
        let (class, index) = Self::decode_id(memory_id);
        let pools = match class {
            PoolClass::Cpu => &self.cpu_pools,
            PoolClass::Gpu => &self.gpu_pools,
        };
        pools.get(index).map(DeviceMemoryPool::available_size)
    }
}

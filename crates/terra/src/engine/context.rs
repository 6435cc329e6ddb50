//! Vulkan instance/device bootstrap, grounded on the teacher's
//! `VulkanInstance`/`LogicalDevice`/`VulkanContext` split but built around
//! Vulkan 1.3 core (dynamic rendering, synchronization2) plus the
//! descriptor-buffer and mesh-shader extensions this engine requires.

use std::ffi::{CStr, CString};

use ash::extensions::ext::{DebugUtils, DescriptorBuffer as DescriptorBufferExt, MeshShader as MeshShaderExt};
use ash::extensions::khr::{Surface as SurfaceLoader, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};

use crate::config::{RenderEngineKind, RendererConfig};
use crate::error::{Error, Result};

use super::queue_family::QueueFamilies;
use super::window::Window;

pub struct VulkanContext {
    pub entry: Entry,
    pub instance: Instance,
    pub debug_utils: Option<DebugUtils>,
    pub debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    pub surface_loader: SurfaceLoader,
    pub surface: vk::SurfaceKHR,
    pub physical_device: vk::PhysicalDevice,
    pub device: Device,
    pub queue_families: QueueFamilies,
    pub swapchain_loader: SwapchainLoader,
    pub descriptor_buffer_ext: DescriptorBufferExt,
    pub mesh_shader_ext: Option<MeshShaderExt>,
    pub descriptor_buffer_properties: vk::PhysicalDeviceDescriptorBufferPropertiesEXT,
}

impl VulkanContext {
    pub fn new(window: &mut Window, config: &RendererConfig) -> Result<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| Error::InvalidOperation(format!("failed to load Vulkan: {e}")))?;

        let instance = Self::create_instance(&entry, window, config)?;

        let (debug_utils, debug_messenger) = if config.enable_validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            let messenger = Self::create_debug_messenger(&debug_utils)?;
            (Some(debug_utils), Some(messenger))
        } else {
            (None, None)
        };

        let surface_loader = SurfaceLoader::new(&entry, &instance);
        let surface = window.create_surface(instance.handle())?;

        let physical_device = Self::select_physical_device(&instance, surface, &surface_loader, config)?;
        let queue_families = QueueFamilies::discover(&instance, physical_device, &surface_loader, surface)?;

        let device = Self::create_device(&instance, physical_device, &queue_families, config)?;
        let swapchain_loader = SwapchainLoader::new(&instance, &device);
        let descriptor_buffer_ext = DescriptorBufferExt::new(&instance, &device);
        let mesh_shader_ext = matches!(config.engine_kind, RenderEngineKind::MeshShader)
            .then(|| MeshShaderExt::new(&instance, &device));

        let mut descriptor_buffer_properties = vk::PhysicalDeviceDescriptorBufferPropertiesEXT::default();
        let mut properties2 =
            vk::PhysicalDeviceProperties2::builder().push_next(&mut descriptor_buffer_properties);
        unsafe { instance.get_physical_device_properties2(physical_device, &mut properties2) };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
            surface_loader,
            surface,
            physical_device,
            device,
            queue_families,
            swapchain_loader,
            descriptor_buffer_ext,
            mesh_shader_ext,
            descriptor_buffer_properties,
        })
    }

    fn create_instance(entry: &Entry, window: &Window, config: &RendererConfig) -> Result<Instance> {
        let app_name = CString::new(config.application_name.clone()).unwrap_or_default();
        let engine_name = CString::new("terra").unwrap();
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .engine_name(&engine_name)
            .api_version(vk::API_VERSION_1_3);

        let required = window.required_instance_extensions()?;
        let required_cstrs: Vec<CString> = required.into_iter().map(|e| CString::new(e).unwrap()).collect();
        let mut extension_ptrs: Vec<*const i8> = required_cstrs.iter().map(|e| e.as_ptr()).collect();
        if config.enable_validation {
            extension_ptrs.push(DebugUtils::name().as_ptr());
        }

        let layer_names = if config.enable_validation {
            vec![CString::new("VK_LAYER_KHRONOS_validation").unwrap()]
        } else {
            Vec::new()
        };
        let layer_ptrs: Vec<*const i8> = layer_names.iter().map(|l| l.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        unsafe { entry.create_instance(&create_info, None) }.map_err(|e| Error::api("creating instance", e))
    }

    fn create_debug_messenger(debug_utils: &DebugUtils) -> Result<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));
        unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .map_err(|e| Error::api("creating debug messenger", e))
    }

    fn select_physical_device(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &SurfaceLoader,
        config: &RendererConfig,
    ) -> Result<vk::PhysicalDevice> {
        let devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(|e| Error::api("enumerating physical devices", e))?;

        let required = Self::required_device_extensions(config);
        for device in devices {
            if QueueFamilies::discover(instance, device, surface_loader, surface).is_err() {
                continue;
            }
            if Self::supports_extensions(instance, device, &required) {
                return Ok(device);
            }
        }
        Err(Error::InvalidOperation("no physical device supports the required extensions".into()))
    }

    fn required_device_extensions(config: &RendererConfig) -> Vec<&'static CStr> {
        let mut extensions = vec![
            SwapchainLoader::name(),
            DescriptorBufferExt::name(),
            CStr::from_bytes_with_nul(b"VK_EXT_memory_budget\0").unwrap(),
        ];
        if matches!(config.engine_kind, RenderEngineKind::MeshShader) {
            extensions.push(MeshShaderExt::name());
        }
        extensions
    }

    fn supports_extensions(instance: &Instance, device: vk::PhysicalDevice, required: &[&CStr]) -> bool {
        let Ok(available) = (unsafe { instance.enumerate_device_extension_properties(device) }) else {
            return false;
        };
        required.iter().all(|req| {
            available
                .iter()
                .any(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) } == *req)
        })
    }

    fn create_device(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        queue_families: &QueueFamilies,
        config: &RendererConfig,
    ) -> Result<Device> {
        let priorities = [1.0f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = queue_families
            .unique_indices()
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let extensions = Self::required_device_extensions(config);
        let extension_ptrs: Vec<*const i8> = extensions.iter().map(|e| e.as_ptr()).collect();

        let mut vulkan13_features = vk::PhysicalDeviceVulkan13Features::builder()
            .dynamic_rendering(true)
            .synchronization2(true);
        let mut descriptor_buffer_features =
            vk::PhysicalDeviceDescriptorBufferFeaturesEXT::builder().descriptor_buffer(true);
        let mut mesh_shader_features = vk::PhysicalDeviceMeshShaderFeaturesEXT::builder()
            .mesh_shader(true)
            .task_shader(true);
        let mut buffer_device_address_features =
            vk::PhysicalDeviceBufferDeviceAddressFeatures::builder().buffer_device_address(true);

        let mut create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs)
            .push_next(&mut vulkan13_features)
            .push_next(&mut descriptor_buffer_features)
            .push_next(&mut buffer_device_address_features);

        if matches!(config.engine_kind, RenderEngineKind::MeshShader) {
            create_info = create_info.push_next(&mut mesh_shader_features);
        }

        unsafe { instance.create_device(physical_device, &create_info, None) }
            .map_err(|e| Error::api("creating logical device", e))
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let data = *callback_data;
    let message = CStr::from_ptr(data.p_message).to_string_lossy();
    if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("[vulkan] {message_type:?} {message}");
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("[vulkan] {message_type:?} {message}");
    } else {
        log::debug!("[vulkan] {message_type:?} {message}");
    }
    vk::FALSE
}

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use log::*;
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::{Handle, KhrSurfaceExtension, KhrSwapchainExtension};
use winit::window::Window;

use super::constants;
use super::instance::VulkanInstance;
use super::logical_device::DeviceRequest;
use super::swapchain::{SharingMode, SwapchainRequest};

/// The calls selection and negotiation make into the graphics API.
///
/// Everything the decision logic needs to know about an adapter, a surface or a
/// logical device goes through here, so the logic itself never touches the
/// loader directly.
pub trait Backend {
    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>, vk::ErrorCode>;

    fn physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties;

    fn physical_device_features(&self, physical_device: vk::PhysicalDevice)
        -> vk::PhysicalDeviceFeatures;

    fn physical_device_memory_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceMemoryProperties;

    fn device_extension_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::ExtensionProperties>, vk::ErrorCode>;

    fn queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties>;

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::ErrorCode>;

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, vk::ErrorCode>;

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, vk::ErrorCode>;

    fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, vk::ErrorCode>;

    fn create_device(&self, request: &DeviceRequest) -> Result<vk::Device, vk::ErrorCode>;

    fn destroy_device(&self, device: vk::Device);

    fn device_queue(&self, device: vk::Device, queue_family_index: u32, queue_index: u32)
        -> vk::Queue;

    fn create_swapchain(
        &self,
        device: vk::Device,
        request: &SwapchainRequest,
    ) -> Result<vk::SwapchainKHR, vk::ErrorCode>;

    fn swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
    ) -> Result<Vec<vk::Image>, vk::ErrorCode>;

    fn destroy_swapchain(&self, device: vk::Device, swapchain: vk::SwapchainKHR);
}

/// Anything that can report the pixel size of the framebuffer behind a surface.
pub trait FramebufferSize {
    fn framebuffer_size(&self) -> vk::Extent2D;
}

impl FramebufferSize for Window {
    fn framebuffer_size(&self) -> vk::Extent2D {
        let size = self.inner_size();
        vk::Extent2D {
            width: size.width,
            height: size.height,
        }
    }
}

/// [`Backend`] on top of a loaded Vulkan instance.
///
/// Logical devices created through it are kept here keyed by handle, since the
/// function table of each device is needed again for queues and swapchains.
pub struct VulkanBackend {
    entry: Entry,
    pub instance: VulkanInstance,
    devices: Mutex<HashMap<vk::Device, Device>>,
}

impl VulkanBackend {
    pub fn new(entry: Entry, instance: VulkanInstance) -> Self {
        Self {
            entry,
            instance,
            devices: Mutex::new(HashMap::new()),
        }
    }

    fn devices(&self) -> MutexGuard<'_, HashMap<vk::Device, Device>> {
        self.devices.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn vk_instance(&self) -> &Instance {
        &self.instance.vk_instance
    }
}

impl fmt::Debug for VulkanBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VulkanBackend")
            .field("instance", &self.instance)
            .field("devices", &self.devices().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Backend for VulkanBackend {
    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>, vk::ErrorCode> {
        unsafe { self.vk_instance().enumerate_physical_devices() }
    }

    fn physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        unsafe { self.vk_instance().get_physical_device_properties(physical_device) }
    }

    fn physical_device_features(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceFeatures {
        unsafe { self.vk_instance().get_physical_device_features(physical_device) }
    }

    fn physical_device_memory_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceMemoryProperties {
        unsafe {
            self.vk_instance()
                .get_physical_device_memory_properties(physical_device)
        }
    }

    fn device_extension_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::ExtensionProperties>, vk::ErrorCode> {
        unsafe {
            self.vk_instance()
                .enumerate_device_extension_properties(physical_device, None)
        }
    }

    fn queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        unsafe {
            self.vk_instance()
                .get_physical_device_queue_family_properties(physical_device)
        }
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::ErrorCode> {
        unsafe {
            self.vk_instance().get_physical_device_surface_support_khr(
                physical_device,
                queue_family_index,
                surface,
            )
        }
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, vk::ErrorCode> {
        unsafe {
            self.vk_instance()
                .get_physical_device_surface_capabilities_khr(physical_device, surface)
        }
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, vk::ErrorCode> {
        unsafe {
            self.vk_instance()
                .get_physical_device_surface_formats_khr(physical_device, surface)
        }
    }

    fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, vk::ErrorCode> {
        unsafe {
            self.vk_instance()
                .get_physical_device_surface_present_modes_khr(physical_device, surface)
        }
    }

    fn create_device(&self, request: &DeviceRequest) -> Result<vk::Device, vk::ErrorCode> {
        let queue_priorities = request
            .queues
            .iter()
            .map(|q| [q.priority])
            .collect::<Vec<_>>();
        let queue_infos = request
            .queues
            .iter()
            .zip(&queue_priorities)
            .map(|(q, priorities)| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(q.family_index)
                    .queue_priorities(priorities)
            })
            .collect::<Vec<_>>();

        let layers = request
            .layers
            .iter()
            .map(|l| l.as_ptr())
            .collect::<Vec<_>>();

        let mut extensions = request
            .extensions
            .iter()
            .map(|e| e.as_ptr())
            .collect::<Vec<_>>();

        // Required by Vulkan SDK on macOS since 1.3.216.
        if cfg!(target_os = "macos")
            && self
                .entry
                .version()
                .map_or(false, |v| v >= constants::PORTABILITY_MACOS_VERSION)
        {
            extensions.push(vk::KHR_PORTABILITY_SUBSET_EXTENSION.name.as_ptr());
        }

        let info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .enabled_features(&request.features);

        let device = unsafe {
            self.vk_instance()
                .create_device(request.physical_device, &info, None)?
        };
        let handle = device.handle();
        self.devices().insert(handle, device);

        Ok(handle)
    }

    fn destroy_device(&self, device: vk::Device) {
        match self.devices().remove(&device) {
            Some(device) => unsafe { device.destroy_device(None) },
            None => warn!("Asked to destroy unknown logical device {:?}.", device),
        }
    }

    fn device_queue(
        &self,
        device: vk::Device,
        queue_family_index: u32,
        queue_index: u32,
    ) -> vk::Queue {
        match self.devices().get(&device) {
            Some(device) => unsafe { device.get_device_queue(queue_family_index, queue_index) },
            None => vk::Queue::null(),
        }
    }

    fn create_swapchain(
        &self,
        device: vk::Device,
        request: &SwapchainRequest,
    ) -> Result<vk::SwapchainKHR, vk::ErrorCode> {
        let devices = self.devices();
        let device = devices
            .get(&device)
            .ok_or(vk::ErrorCode::INITIALIZATION_FAILED)?;

        let (sharing_mode, queue_family_indices): (_, &[u32]) = match &request.sharing {
            SharingMode::Exclusive => (vk::SharingMode::EXCLUSIVE, &[]),
            SharingMode::Concurrent(families) => (vk::SharingMode::CONCURRENT, families.as_slice()),
        };

        let info = vk::SwapchainCreateInfoKHR::builder()
            .surface(request.surface)
            .min_image_count(request.image_count)
            .image_format(request.format.format)
            .image_color_space(request.format.color_space)
            .image_extent(request.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(queue_family_indices)
            .pre_transform(request.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(request.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        unsafe { device.create_swapchain_khr(&info, None) }
    }

    fn swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
    ) -> Result<Vec<vk::Image>, vk::ErrorCode> {
        let devices = self.devices();
        let device = devices
            .get(&device)
            .ok_or(vk::ErrorCode::INITIALIZATION_FAILED)?;
        unsafe { device.get_swapchain_images_khr(swapchain) }
    }

    fn destroy_swapchain(&self, device: vk::Device, swapchain: vk::SwapchainKHR) {
        match self.devices().get(&device) {
            Some(device) => unsafe { device.destroy_swapchain_khr(swapchain, None) },
            None => warn!("Asked to destroy a swapchain on unknown device {:?}.", device),
        }
    }
}

//! Scripted [`Backend`] for unit tests (no GPU required).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use vulkanalia::vk::{self, Handle};

use super::backend::{Backend, FramebufferSize};
use super::device::{DeviceInfo, PhysicalDeviceInfo};
use super::logical_device::DeviceRequest;
use super::queue::QueueFamilyIndices;
use super::swapchain::SwapchainRequest;

const GIB: u64 = 1024 * 1024 * 1024;
const SWAPCHAIN_IMAGES: u64 = 3;

/// One scripted adapter. The defaults describe a device that passes every
/// eligibility check with a single graphics + present queue family.
#[derive(Clone, Debug)]
pub struct MockAdapter {
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub memory: vk::PhysicalDeviceMemoryProperties,
    pub extensions: Vec<vk::ExtensionName>,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
    pub present_families: Vec<u32>,
    pub capabilities: Option<vk::SurfaceCapabilitiesKHR>,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    pub fail_extension_query: bool,
    pub fail_present_query: bool,
    pub fail_surface_lists: bool,
}

impl MockAdapter {
    fn new(name: &str, device_type: vk::PhysicalDeviceType) -> Self {
        let properties = vk::PhysicalDeviceProperties {
            device_type,
            device_name: vk::StringArray::from_bytes(name.as_bytes()),
            limits: vk::PhysicalDeviceLimits {
                max_image_dimension_2d: 16384,
                ..Default::default()
            },
            ..Default::default()
        };

        let features = vk::PhysicalDeviceFeatures {
            geometry_shader: vk::TRUE,
            ..Default::default()
        };

        let mut adapter = Self {
            properties,
            features,
            memory: vk::PhysicalDeviceMemoryProperties::default(),
            extensions: vec![vk::KHR_SWAPCHAIN_EXTENSION.name],
            queue_families: vec![vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER,
                queue_count: 1,
                ..Default::default()
            }],
            present_families: vec![0],
            capabilities: Some(vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 4,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D {
                    width: 200,
                    height: 200,
                },
                max_image_extent: vk::Extent2D {
                    width: 1024,
                    height: 1024,
                },
                ..Default::default()
            }),
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::R8G8B8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            fail_extension_query: false,
            fail_present_query: false,
            fail_surface_lists: false,
        };
        adapter.set_heap(4 * GIB, vk::MemoryHeapFlags::DEVICE_LOCAL);
        adapter
    }

    pub fn discrete(name: &str) -> Self {
        Self::new(name, vk::PhysicalDeviceType::DISCRETE_GPU)
    }

    pub fn integrated(name: &str) -> Self {
        Self::new(name, vk::PhysicalDeviceType::INTEGRATED_GPU)
    }

    fn set_heap(&mut self, size: u64, flags: vk::MemoryHeapFlags) {
        // A host-visible heap first, so attribution has to search.
        self.memory.memory_heap_count = 2;
        self.memory.memory_heaps[0] = vk::MemoryHeap {
            size: GIB,
            flags: vk::MemoryHeapFlags::empty(),
        };
        self.memory.memory_heaps[1] = vk::MemoryHeap { size, flags };
    }

    pub fn with_device_type(mut self, device_type: vk::PhysicalDeviceType) -> Self {
        self.properties.device_type = device_type;
        self
    }

    pub fn with_vram(mut self, size: u64) -> Self {
        self.set_heap(size, vk::MemoryHeapFlags::DEVICE_LOCAL);
        self
    }

    pub fn without_device_local_heap(mut self) -> Self {
        let size = self.memory.memory_heaps[1].size;
        self.set_heap(size, vk::MemoryHeapFlags::empty());
        self
    }

    pub fn with_max_image_dimension(mut self, dimension: u32) -> Self {
        self.properties.limits.max_image_dimension_2d = dimension;
        self
    }

    pub fn without_geometry_shader(mut self) -> Self {
        self.features.geometry_shader = vk::FALSE;
        self
    }

    pub fn without_swapchain_extension(mut self) -> Self {
        self.extensions.clear();
        self
    }

    pub fn failing_extension_query(mut self) -> Self {
        self.fail_extension_query = true;
        self
    }

    pub fn failing_present_query(mut self) -> Self {
        self.fail_present_query = true;
        self
    }

    /// Capabilities still succeed, but format and present mode queries fail.
    pub fn failing_surface_lists(mut self) -> Self {
        self.fail_surface_lists = true;
        self
    }

    pub fn with_queue_families(mut self, families: Vec<vk::QueueFamilyProperties>) -> Self {
        self.queue_families = families;
        self
    }

    /// Graphics on family 0, presentation only on family 1.
    pub fn with_split_queue_families(mut self) -> Self {
        self.queue_families = vec![
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::GRAPHICS,
                queue_count: 1,
                ..Default::default()
            },
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::TRANSFER,
                queue_count: 1,
                ..Default::default()
            },
        ];
        self.present_families = vec![1];
        self
    }

    pub fn without_presentation(mut self) -> Self {
        self.present_families.clear();
        self
    }

    pub fn without_surface_capabilities(mut self) -> Self {
        self.capabilities = None;
        self
    }

    pub fn with_formats(mut self, formats: Vec<vk::SurfaceFormatKHR>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_present_modes(mut self, present_modes: Vec<vk::PresentModeKHR>) -> Self {
        self.present_modes = present_modes;
        self
    }

    /// What probing this adapter would produce, without going through a backend.
    pub fn device_info(&self) -> DeviceInfo {
        let heap = self.memory.memory_heaps[..self.memory.memory_heap_count as usize]
            .iter()
            .find(|h| h.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .copied()
            .unwrap_or_default();

        DeviceInfo {
            device: PhysicalDeviceInfo {
                handle: vk::PhysicalDevice::null(),
                name: Some(self.properties.device_name.to_string()),
            },
            properties: self.properties,
            features: self.features,
            memory_heap: heap,
            queue_family_indices: QueueFamilyIndices::from_families(&self.queue_families, |i| {
                self.present_families.contains(&i)
            }),
        }
    }
}

#[derive(Debug)]
pub struct MockBackend {
    adapters: Vec<MockAdapter>,
    fail_enumeration: bool,
    fail_device: bool,
    fail_swapchain: bool,
    fail_swapchain_images: bool,
    swapchain_image_count: u64,
    next_handle: AtomicUsize,
    device_requests: Mutex<Vec<DeviceRequest>>,
    destroyed_devices: Mutex<Vec<vk::Device>>,
    swapchain_requests: Mutex<Vec<SwapchainRequest>>,
    destroyed_swapchains: Mutex<Vec<vk::SwapchainKHR>>,
}

impl MockBackend {
    pub fn new(adapters: Vec<MockAdapter>) -> Self {
        let _ = pretty_env_logger::try_init();

        Self {
            adapters,
            fail_enumeration: false,
            fail_device: false,
            fail_swapchain: false,
            fail_swapchain_images: false,
            swapchain_image_count: SWAPCHAIN_IMAGES,
            next_handle: AtomicUsize::new(1),
            device_requests: Mutex::new(Vec::new()),
            destroyed_devices: Mutex::new(Vec::new()),
            swapchain_requests: Mutex::new(Vec::new()),
            destroyed_swapchains: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_enumeration(mut self) -> Self {
        self.fail_enumeration = true;
        self
    }

    pub fn failing_device(mut self) -> Self {
        self.fail_device = true;
        self
    }

    pub fn failing_swapchain(mut self) -> Self {
        self.fail_swapchain = true;
        self
    }

    pub fn failing_swapchain_images(mut self) -> Self {
        self.fail_swapchain_images = true;
        self
    }

    pub fn without_swapchain_images(mut self) -> Self {
        self.swapchain_image_count = 0;
        self
    }

    pub fn adapter_handle(&self, index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw((index + 1) as _)
    }

    fn adapter(&self, physical_device: vk::PhysicalDevice) -> &MockAdapter {
        &self.adapters[physical_device.as_raw() as usize - 1]
    }

    fn next_raw(&self) -> usize {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    pub fn device_requests(&self) -> Vec<DeviceRequest> {
        self.device_requests.lock().unwrap().clone()
    }

    pub fn destroyed_devices(&self) -> Vec<vk::Device> {
        self.destroyed_devices.lock().unwrap().clone()
    }

    pub fn swapchain_requests(&self) -> Vec<SwapchainRequest> {
        self.swapchain_requests.lock().unwrap().clone()
    }

    pub fn destroyed_swapchains(&self) -> Vec<vk::SwapchainKHR> {
        self.destroyed_swapchains.lock().unwrap().clone()
    }
}

impl Backend for MockBackend {
    fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>, vk::ErrorCode> {
        if self.fail_enumeration {
            return Err(vk::ErrorCode::INITIALIZATION_FAILED);
        }
        Ok((0..self.adapters.len())
            .map(|i| self.adapter_handle(i))
            .collect())
    }

    fn physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        self.adapter(physical_device).properties
    }

    fn physical_device_features(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceFeatures {
        self.adapter(physical_device).features
    }

    fn physical_device_memory_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceMemoryProperties {
        self.adapter(physical_device).memory
    }

    fn device_extension_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::ExtensionProperties>, vk::ErrorCode> {
        let adapter = self.adapter(physical_device);
        if adapter.fail_extension_query {
            return Err(vk::ErrorCode::INITIALIZATION_FAILED);
        }
        Ok(adapter
            .extensions
            .iter()
            .map(|name| vk::ExtensionProperties {
                extension_name: *name,
                spec_version: 1,
            })
            .collect())
    }

    fn queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        self.adapter(physical_device).queue_families.clone()
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        _surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::ErrorCode> {
        let adapter = self.adapter(physical_device);
        if adapter.fail_present_query {
            return Err(vk::ErrorCode::SURFACE_LOST_KHR);
        }
        Ok(adapter.present_families.contains(&queue_family_index))
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, vk::ErrorCode> {
        self.adapter(physical_device)
            .capabilities
            .ok_or(vk::ErrorCode::SURFACE_LOST_KHR)
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, vk::ErrorCode> {
        let adapter = self.adapter(physical_device);
        if adapter.fail_surface_lists {
            return Err(vk::ErrorCode::SURFACE_LOST_KHR);
        }
        Ok(adapter.formats.clone())
    }

    fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, vk::ErrorCode> {
        let adapter = self.adapter(physical_device);
        if adapter.fail_surface_lists {
            return Err(vk::ErrorCode::SURFACE_LOST_KHR);
        }
        Ok(adapter.present_modes.clone())
    }

    fn create_device(&self, request: &DeviceRequest) -> Result<vk::Device, vk::ErrorCode> {
        self.device_requests.lock().unwrap().push(request.clone());
        if self.fail_device {
            return Err(vk::ErrorCode::INITIALIZATION_FAILED);
        }
        Ok(vk::Device::from_raw(self.next_raw() as _))
    }

    fn destroy_device(&self, device: vk::Device) {
        self.destroyed_devices.lock().unwrap().push(device);
    }

    fn device_queue(
        &self,
        device: vk::Device,
        queue_family_index: u32,
        queue_index: u32,
    ) -> vk::Queue {
        let raw = device.as_raw() * 1000
            + queue_family_index as usize * 10
            + queue_index as usize
            + 1;
        vk::Queue::from_raw(raw as _)
    }

    fn create_swapchain(
        &self,
        _device: vk::Device,
        request: &SwapchainRequest,
    ) -> Result<vk::SwapchainKHR, vk::ErrorCode> {
        self.swapchain_requests.lock().unwrap().push(*request);
        if self.fail_swapchain {
            return Err(vk::ErrorCode::OUT_OF_DEVICE_MEMORY);
        }
        Ok(vk::SwapchainKHR::from_raw(self.next_raw() as _))
    }

    fn swapchain_images(
        &self,
        _device: vk::Device,
        swapchain: vk::SwapchainKHR,
    ) -> Result<Vec<vk::Image>, vk::ErrorCode> {
        if self.fail_swapchain_images {
            return Err(vk::ErrorCode::OUT_OF_HOST_MEMORY);
        }
        let base = swapchain.as_raw() * 100;
        Ok((1..=self.swapchain_image_count)
            .map(|i| vk::Image::from_raw(base + i))
            .collect())
    }

    fn destroy_swapchain(&self, _device: vk::Device, swapchain: vk::SwapchainKHR) {
        self.destroyed_swapchains.lock().unwrap().push(swapchain);
    }
}

/// A window whose framebuffer never changes size.
#[derive(Copy, Clone, Debug)]
pub struct FixedWindow(vk::Extent2D);

impl FixedWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self(vk::Extent2D { width, height })
    }
}

impl FramebufferSize for FixedWindow {
    fn framebuffer_size(&self) -> vk::Extent2D {
        self.0
    }
}

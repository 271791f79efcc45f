use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use log::*;
use thiserror::Error;
use vulkanalia::vk::{self, Handle};

use super::backend::Backend;
use super::constants;
use super::device::DeviceInfo;
use super::queue::QueueFamilyIndices;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Selected device `{0}` is missing required queue families.")]
    IncompleteQueueFamilies(String),
    #[error("Failed to create logical device: {0}")]
    Creation(#[source] vk::ErrorCode),
    #[error("Logical device {0:?} is not registered as live.")]
    NotLive(vk::Device),
}

/// The set of logical devices that are currently alive.
///
/// Cloning shares the same set. Anything bound to a device checks here before
/// it releases native resources.
#[derive(Clone, Debug, Default)]
pub struct DeviceRegistry {
    live: Arc<Mutex<HashSet<vk::Device>>>,
}

impl DeviceRegistry {
    fn live(&self) -> MutexGuard<'_, HashSet<vk::Device>> {
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn register(&self, device: vk::Device) {
        self.live().insert(device);
    }

    /// Removes `device` and reports whether it was registered. Check and
    /// removal happen under one lock.
    fn release(&self, device: vk::Device) -> bool {
        self.live().remove(&device)
    }

    pub fn is_live(&self, device: vk::Device) -> bool {
        !device.is_null() && self.live().contains(&device)
    }

    pub fn len(&self) -> usize {
        self.live().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live().is_empty()
    }
}

/// Proof of which device a resource was created on, along with the registry
/// that knows whether that device is still alive.
#[derive(Clone, Debug)]
pub struct DeviceToken {
    device: vk::Device,
    registry: DeviceRegistry,
}

impl DeviceToken {
    pub fn device(&self) -> vk::Device {
        self.device
    }

    pub fn is_live(&self) -> bool {
        self.registry.is_live(self.device)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QueueRequest {
    pub family_index: u32,
    pub priority: f32,
}

/// Everything needed to create a logical device.
#[derive(Clone, Debug)]
pub struct DeviceRequest {
    pub physical_device: vk::PhysicalDevice,
    pub queues: Vec<QueueRequest>,
    pub features: vk::PhysicalDeviceFeatures,
    pub extensions: Vec<vk::ExtensionName>,
    pub layers: Vec<vk::ExtensionName>,
}

impl DeviceRequest {
    /// One queue per distinct family, so a family that fills several roles is
    /// only requested once.
    pub fn queue_requests(indices: &QueueFamilyIndices) -> Vec<QueueRequest> {
        indices
            .unique_families()
            .into_iter()
            .map(|family_index| QueueRequest {
                family_index,
                priority: constants::QUEUE_PRIORITY,
            })
            .collect()
    }
}

/// A live logical device and its queues.
#[derive(Debug)]
pub struct VulkanDevice {
    handle: vk::Device,
    info: DeviceInfo,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    token: DeviceToken,
}

impl VulkanDevice {
    pub fn handle(&self) -> vk::Device {
        self.handle
    }

    /// The selection this device was created from.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn token(&self) -> &DeviceToken {
        &self.token
    }

    pub fn is_live(&self) -> bool {
        self.token.is_live()
    }
}

/// Creates and destroys logical devices, keeping the registry in sync.
#[derive(Clone, Debug, Default)]
pub struct DeviceManager {
    registry: DeviceRegistry,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Creates the logical device for `selection` and registers it as live.
    pub fn create(
        &self,
        backend: &impl Backend,
        selection: DeviceInfo,
        validation: bool,
    ) -> Result<VulkanDevice, DeviceError> {
        let indices = selection.queue_family_indices;
        let (graphics, presentation) = match (indices.graphics(), indices.presentation()) {
            (Some(graphics), Some(presentation)) => (graphics, presentation),
            _ => {
                return Err(DeviceError::IncompleteQueueFamilies(
                    selection.device.display_name().to_string(),
                ))
            }
        };

        let layers = if validation {
            vec![constants::VALIDATION_LAYER]
        } else {
            vec![]
        };

        let request = DeviceRequest {
            physical_device: selection.device.handle,
            queues: DeviceRequest::queue_requests(&indices),
            features: selection.features,
            extensions: constants::REQUIRED_DEVICE_EXTENSIONS.to_vec(),
            layers,
        };

        let handle = backend
            .create_device(&request)
            .map_err(DeviceError::Creation)?;
        info!(
            "Created logical device with {} queue(s).",
            request.queues.len()
        );

        self.registry.register(handle);

        Ok(VulkanDevice {
            handle,
            graphics_queue: backend.device_queue(handle, graphics, 0),
            present_queue: backend.device_queue(handle, presentation, 0),
            token: DeviceToken {
                device: handle,
                registry: self.registry.clone(),
            },
            info: selection,
        })
    }

    /// Releases `device`. A device this manager does not know as live is a
    /// lifecycle bug in the caller and is reported as [`DeviceError::NotLive`].
    /// Destroying an already destroyed device does nothing.
    pub fn destroy(
        &self,
        backend: &impl Backend,
        device: &mut VulkanDevice,
    ) -> Result<(), DeviceError> {
        if device.handle.is_null() {
            return Ok(());
        }

        if !self.registry.release(device.handle) {
            return Err(DeviceError::NotLive(device.handle));
        }

        debug!("Destroying logical device.");
        backend.destroy_device(device.handle);
        device.handle = vk::Device::null();
        device.graphics_queue = vk::Queue::null();
        device.present_queue = vk::Queue::null();

        Ok(())
    }
}

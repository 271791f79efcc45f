use std::collections::HashSet;

use log::*;
use thiserror::Error;
use vulkanalia::vk;

use super::backend::Backend;
use super::constants;
use super::queue::QueueFamilyIndices;
use super::scorer::{self, Comparison};
use super::swapchain::SwapchainSupport;
use crate::config::SelectionPolicy;

#[derive(Debug, Error)]
#[error("Missing {0}.")]
pub struct SuitabilityError(pub &'static str);

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Failed to enumerate physical devices: {0}")]
    Enumeration(#[source] vk::ErrorCode),
    #[error("Could not find available GPUs with Vulkan support.")]
    NoAdapters,
    #[error("Failed to find suitable physical device.")]
    NoSuitableAdapter,
}

/// A physical device handle, plus its name when diagnostics are enabled.
#[derive(Clone, Debug, Default)]
pub struct PhysicalDeviceInfo {
    pub handle: vk::PhysicalDevice,
    pub name: Option<String>,
}

impl PhysicalDeviceInfo {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed device>")
    }
}

/// Everything probed about one physical device.
#[derive(Clone, Debug, Default)]
pub struct DeviceInfo {
    pub device: PhysicalDeviceInfo,
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    /// The first device-local heap, or an empty heap when there is none.
    pub memory_heap: vk::MemoryHeap,
    pub queue_family_indices: QueueFamilyIndices,
}

impl DeviceInfo {
    /// Queries `physical_device` without creating anything, and reports what
    /// the surface offers it alongside.
    pub fn probe(
        backend: &impl Backend,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        diagnostics: bool,
    ) -> (Self, SwapchainSupport) {
        let properties = backend.physical_device_properties(physical_device);
        let features = backend.physical_device_features(physical_device);
        let memory = backend.physical_device_memory_properties(physical_device);

        let device = PhysicalDeviceInfo {
            handle: physical_device,
            name: diagnostics.then(|| properties.device_name.to_string()),
        };
        let name = device.display_name();
        if diagnostics {
            info!("Checking device `{}`.", name);
        }

        let queue_family_indices =
            QueueFamilyIndices::resolve(backend, physical_device, surface, name);
        let support = SwapchainSupport::probe(backend, physical_device, surface, name);

        let info = Self {
            memory_heap: device_local_heap(&memory),
            device,
            properties,
            features,
            queue_family_indices,
        };
        (info, support)
    }

    pub fn vram(&self) -> Option<vk::DeviceSize> {
        self.memory_heap
            .flags
            .contains(vk::MemoryHeapFlags::DEVICE_LOCAL)
            .then_some(self.memory_heap.size)
    }
}

fn device_local_heap(memory: &vk::PhysicalDeviceMemoryProperties) -> vk::MemoryHeap {
    memory
        .memory_heaps
        .iter()
        .take(memory.memory_heap_count as usize)
        .find(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
        .copied()
        .unwrap_or_default()
}

/// Whether `physical_device` exposes every extension in
/// [`constants::REQUIRED_DEVICE_EXTENSIONS`].
fn supports_required_extensions(
    backend: &impl Backend,
    info: &DeviceInfo,
    diagnostics: bool,
) -> bool {
    let name = info.device.display_name();
    let available = match backend.device_extension_properties(info.device.handle) {
        Ok(extensions) => extensions
            .iter()
            .map(|e| e.extension_name)
            .collect::<HashSet<_>>(),
        Err(e) => {
            warn!("Failed to enumerate extensions of `{}`: {}", name, e);
            return false;
        }
    };

    if available.is_empty() {
        debug!("No extensions found for `{}`.", name);
        return false;
    }

    let mut supported = true;
    for extension in constants::REQUIRED_DEVICE_EXTENSIONS {
        let found = available.contains(extension);
        if diagnostics {
            if found {
                debug!("`{}` supports {}.", name, extension);
            } else {
                debug!("`{}` does not support {}.", name, extension);
            }
        }
        supported &= found;
    }
    supported
}

fn check_physical_device(
    backend: &impl Backend,
    info: &DeviceInfo,
    support: &SwapchainSupport,
    diagnostics: bool,
) -> Result<(), SuitabilityError> {
    if !supports_required_extensions(backend, info, diagnostics) {
        return Err(SuitabilityError("required device extensions"));
    }
    if info.features.geometry_shader != vk::TRUE {
        return Err(SuitabilityError("geometry shader support"));
    }
    if !info.queue_family_indices.is_complete() {
        return Err(SuitabilityError("required queue families"));
    }
    if !support.is_compatible() {
        return Err(SuitabilityError("swapchain support"));
    }
    Ok(())
}

/// Picks the physical device to render with.
///
/// Adapters are visited in enumeration order. The first eligible one is taken
/// as is; every later eligible one replaces it only if it ranks strictly
/// higher against the baseline `policy` names. Failing to find any eligible
/// device is an error the caller cannot recover from.
pub fn pick_physical_device(
    backend: &impl Backend,
    surface: vk::SurfaceKHR,
    policy: SelectionPolicy,
    diagnostics: bool,
) -> Result<DeviceInfo, SelectionError> {
    let physical_devices = backend
        .enumerate_physical_devices()
        .map_err(SelectionError::Enumeration)?;
    if physical_devices.is_empty() {
        return Err(SelectionError::NoAdapters);
    }

    let mut selected: Option<DeviceInfo> = None;
    let mut previous: Option<DeviceInfo> = None;

    for physical_device in physical_devices {
        let (info, support) = DeviceInfo::probe(backend, physical_device, surface, diagnostics);

        if let Err(error) = check_physical_device(backend, &info, &support, diagnostics) {
            warn!(
                "Skipping physical device (`{}`): {}",
                info.properties.device_name, error
            );
            continue;
        }
        if diagnostics {
            info!(
                "`{}` supports all required features.",
                info.device.display_name()
            );
        }

        let baseline = match policy {
            SelectionPolicy::RunningBest => selected.as_ref(),
            SelectionPolicy::PreviousEligible => previous.as_ref(),
        };
        let replace = match baseline.map(|baseline| scorer::compare(&info, baseline)) {
            None | Some(Comparison::Greater) => true,
            Some(Comparison::Fail) => {
                warn!(
                    "Could not rank `{}`, keeping the current selection.",
                    info.properties.device_name
                );
                false
            }
            Some(Comparison::Equal | Comparison::Less) => false,
        };

        if replace {
            selected = Some(info.clone());
        }
        previous = Some(info);
    }

    let selected = selected.ok_or(SelectionError::NoSuitableAdapter)?;
    info!(
        "Selected physical device (`{}`, {:?}, {} MiB VRAM).",
        selected.properties.device_name,
        selected.properties.device_type,
        selected.vram().unwrap_or(0) / (1024 * 1024)
    );
    Ok(selected)
}

use anyhow::{anyhow, Result};
use log::*;
use vulkanalia::{
    loader::{LibloadingLoader, LIBRARY},
    vk, Entry,
};
use winit::window::Window;

use crate::config::Config;

pub mod backend;
pub mod constants;
pub mod context;
pub mod device;
pub mod instance;
pub mod logical_device;
pub mod queue;
pub mod scorer;
pub mod swapchain;

#[cfg(test)]
mod mock;

use backend::{Backend, VulkanBackend};
use context::VulkanContext;
use instance::VulkanInstance;
use logical_device::{DeviceManager, VulkanDevice};
use swapchain::VulkanSwapchain;

/// Selects an adapter for `surface` and creates its logical device. On error
/// nothing has been created on the device side.
fn create_device(
    backend: &impl Backend,
    manager: &DeviceManager,
    surface: vk::SurfaceKHR,
    config: &Config,
) -> Result<VulkanDevice> {
    let selection = device::pick_physical_device(
        backend,
        surface,
        config.selection_policy,
        config.diagnostics,
    )?;

    Ok(manager.create(backend, selection, config.validation)?)
}

/// Owns every Vulkan object the application creates, in creation order.
#[derive(Debug)]
pub struct VulkanRenderer {
    backend: VulkanBackend,
    context: VulkanContext,
    manager: DeviceManager,
    pub device: VulkanDevice,
    pub swapchain: VulkanSwapchain,
    destroyed: bool,
}

impl VulkanRenderer {
    pub unsafe fn new(window: &Window, config: &Config) -> Result<VulkanRenderer> {
        let loader = LibloadingLoader::new(LIBRARY)?;
        let entry = Entry::new(loader).map_err(|b| anyhow!("{}", b))?;

        let mut context = VulkanContext::default();
        let instance = VulkanInstance::new(window, &entry, config, &mut context)?;
        let mut backend = VulkanBackend::new(entry, instance);

        let manager = DeviceManager::new();
        let device = match create_device(&backend, &manager, context.surface, config) {
            Ok(device) => device,
            Err(e) => {
                backend.instance.destroy(&mut context);
                return Err(e);
            }
        };

        let swapchain = VulkanSwapchain::build(&backend, context.surface, window, &device);
        if !swapchain.is_bound() {
            warn!("Continuing without a swapchain.");
        }

        Ok(VulkanRenderer {
            backend,
            context,
            manager,
            device,
            swapchain,
            destroyed: false,
        })
    }

    /// Tears everything down: swapchain, then logical device, then surface,
    /// messenger and instance. Calling it again does nothing.
    pub unsafe fn destroy(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }

        self.swapchain.destroy(&self.backend, self.device.token())?;
        self.manager.destroy(&self.backend, &mut self.device)?;
        self.backend.instance.destroy(&mut self.context);
        self.destroyed = true;

        Ok(())
    }
}

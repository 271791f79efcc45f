use anyhow::Result;
use winit::window::Window;

use crate::config::Config;
use crate::vulkan::VulkanRenderer;

#[derive(Debug)]
pub struct Renderer {
    pub vk_renderer: VulkanRenderer,
}

impl Renderer {
    /// Selects an adapter and brings up the device and swapchain for `window`.
    pub unsafe fn create(window: &Window, config: &Config) -> Result<Self> {
        let vk_renderer = VulkanRenderer::new(window, config)?;

        Ok(Self { vk_renderer })
    }

    pub unsafe fn destroy(&mut self) -> Result<()> {
        self.vk_renderer.destroy()
    }
}

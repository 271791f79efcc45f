use vulkanalia::vk;

/// The instance-level Vulkan handles shared by the renderer.
#[derive(Clone, Debug, Default)]
pub struct VulkanContext {
    pub messenger: vk::DebugUtilsMessengerEXT,
    pub surface: vk::SurfaceKHR,
}

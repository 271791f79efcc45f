use vulkanalia::{vk, Version};

pub const PORTABILITY_MACOS_VERSION: Version = Version::new(1, 3, 216);
pub const VALIDATION_LAYER: vk::ExtensionName =
    vk::ExtensionName::from_bytes(b"VK_LAYER_KHRONOS_validation");

/// Device extensions every candidate has to expose. Not every GPU can present
/// to a screen, so the swapchain extension is the only hard requirement.
pub const REQUIRED_DEVICE_EXTENSIONS: &[vk::ExtensionName] = &[vk::KHR_SWAPCHAIN_EXTENSION.name];

pub const QUEUE_PRIORITY: f32 = 1.0;

pub const APPLICATION_NAME: &[u8] = b"mcvk\0";
pub const ENGINE_NAME: &[u8] = b"No Engine\0";

use log::*;
use thiserror::Error;
use vulkanalia::vk::{self, Handle};

use super::backend::{Backend, FramebufferSize};
use super::logical_device::{DeviceToken, VulkanDevice};
use super::queue::QueueFamilyIndices;

#[derive(Debug, Error)]
pub enum SwapchainError {
    #[error("Swapchain is bound to device {0:?}, which is not live anymore.")]
    DeviceNotLive(vk::Device),
    #[error("Swapchain is bound to device {bound:?}, but the token is for {given:?}.")]
    WrongDevice { bound: vk::Device, given: vk::Device },
}

/// What a surface offers a physical device. Probing never creates anything.
#[derive(Clone, Debug, Default)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub fn probe(
        backend: &impl Backend,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        name: &str,
    ) -> Self {
        let capabilities = match backend.surface_capabilities(physical_device, surface) {
            Ok(capabilities) => capabilities,
            Err(e) => {
                debug!("Failed to retrieve surface capabilities for `{}`: {}", name, e);
                return Self::default();
            }
        };

        let formats = backend
            .surface_formats(physical_device, surface)
            .unwrap_or_else(|e| {
                debug!("Failed to retrieve surface formats for `{}`: {}", name, e);
                Vec::new()
            });
        if formats.is_empty() {
            debug!("No surface formats found for `{}`.", name);
        } else {
            debug!("Found {} surface formats for `{}`.", formats.len(), name);
        }

        let present_modes = backend
            .surface_present_modes(physical_device, surface)
            .unwrap_or_else(|e| {
                debug!("Failed to retrieve present modes for `{}`: {}", name, e);
                Vec::new()
            });
        if present_modes.is_empty() {
            debug!("No present modes found for `{}`.", name);
        } else {
            debug!("Found {} present modes for `{}`.", present_modes.len(), name);
        }

        Self {
            capabilities,
            formats,
            present_modes,
        }
    }

    pub fn supports_formats(&self) -> bool {
        !self.formats.is_empty()
    }

    pub fn supports_present_modes(&self) -> bool {
        !self.present_modes.is_empty()
    }

    pub fn is_compatible(&self) -> bool {
        self.supports_formats() && self.supports_present_modes()
    }
}

/// Prefers 8-bit BGRA in the nonlinear sRGB color space, otherwise the first
/// format the surface lists.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// Mailbox when available. FIFO is guaranteed to exist on every surface.
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    present_modes
        .iter()
        .copied()
        .find(|m| *m == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Uses the surface's current extent unless it holds the `u32::MAX` sentinel,
/// in which case the framebuffer size is clamped into the supported range.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer: vk::Extent2D,
) -> vk::Extent2D {
    let current = capabilities.current_extent;
    if current.width != u32::MAX && current.height != u32::MAX {
        return current;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: framebuffer.width.max(min.width).min(max.width.max(min.width)),
        height: framebuffer.height.max(min.height).min(max.height.max(min.height)),
    }
}

/// One image more than the minimum, capped by the maximum. A maximum of zero
/// means the surface puts no upper bound on the count.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let min = capabilities.min_image_count;
    let desired = min.saturating_add(1);
    if capabilities.max_image_count == 0 {
        desired
    } else {
        desired.min(capabilities.max_image_count).max(min)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SharingMode {
    Exclusive,
    Concurrent([u32; 2]),
}

impl SharingMode {
    /// Exclusive when graphics and presentation share a family, concurrent
    /// across both families otherwise.
    pub fn for_families(graphics: u32, presentation: u32) -> Self {
        if graphics == presentation {
            SharingMode::Exclusive
        } else {
            SharingMode::Concurrent([graphics, presentation])
        }
    }
}

/// The negotiated parameters of a swapchain.
#[derive(Copy, Clone, Debug)]
pub struct SwapchainRequest {
    pub surface: vk::SurfaceKHR,
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub sharing: SharingMode,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainRequest {
    /// `None` when the surface is incompatible or the roles are unresolved.
    pub fn negotiate(
        support: &SwapchainSupport,
        surface: vk::SurfaceKHR,
        window: &impl FramebufferSize,
        indices: &QueueFamilyIndices,
    ) -> Option<Self> {
        if !support.is_compatible() {
            return None;
        }
        let (graphics, presentation) = (indices.graphics()?, indices.presentation()?);

        let format = choose_surface_format(&support.formats)?;
        if format.format == vk::Format::B8G8R8A8_SRGB {
            debug!("Using B8G8R8A8_SRGB for the swapchain.");
        } else {
            debug!("No sRGB surface format available, using {:?}.", format.format);
        }

        let present_mode = choose_present_mode(&support.present_modes);
        debug!("Using {:?} present mode.", present_mode);

        Some(Self {
            surface,
            format,
            present_mode,
            extent: choose_extent(&support.capabilities, window.framebuffer_size()),
            image_count: choose_image_count(&support.capabilities),
            sharing: SharingMode::for_families(graphics, presentation),
            pre_transform: support.capabilities.current_transform,
        })
    }
}

/// A swapchain and the images it owns.
///
/// An unbound swapchain holds no native object. A bound one must be destroyed
/// while the device it was created on is still live.
#[derive(Debug, Default)]
pub struct VulkanSwapchain {
    swapchain: vk::SwapchainKHR,
    device: vk::Device,
    pub images: Vec<vk::Image>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl VulkanSwapchain {
    pub fn unbound() -> Self {
        Self::default()
    }

    /// Builds the swapchain for `device` on `surface`.
    ///
    /// If the device is not live, the surface turns out incompatible, or
    /// creation fails, the result is unbound. None of these stop the caller.
    pub fn build(
        backend: &impl Backend,
        surface: vk::SurfaceKHR,
        window: &impl FramebufferSize,
        device: &VulkanDevice,
    ) -> Self {
        if !device.is_live() {
            debug!("Device is not live, skipping swapchain creation.");
            return Self::unbound();
        }

        let info = device.info();
        let name = info.device.display_name();
        let support = SwapchainSupport::probe(backend, info.device.handle, surface, name);

        let request = match SwapchainRequest::negotiate(
            &support,
            surface,
            window,
            &info.queue_family_indices,
        ) {
            Some(request) => request,
            None => {
                error!("`{}` cannot present to the surface.", name);
                return Self::unbound();
            }
        };

        debug!(
            "Swapchain extent: {}x{}, {} images.",
            request.extent.width, request.extent.height, request.image_count
        );

        let swapchain = match backend.create_swapchain(device.handle(), &request) {
            Ok(swapchain) => swapchain,
            Err(e) => {
                error!("Failed to create swapchain: {}", e);
                return Self::unbound();
            }
        };
        info!("Swapchain created for `{}`.", name);

        let images = match backend.swapchain_images(device.handle(), swapchain) {
            Ok(images) if !images.is_empty() => images,
            Ok(_) => {
                error!("No images found for swapchain.");
                Vec::new()
            }
            Err(e) => {
                error!("Failed to retrieve swapchain images: {}", e);
                Vec::new()
            }
        };

        Self {
            swapchain,
            device: device.handle(),
            images,
            format: request.format.format,
            extent: request.extent,
        }
    }

    pub fn is_bound(&self) -> bool {
        !self.swapchain.is_null()
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn device(&self) -> vk::Device {
        self.device
    }

    /// Releases the swapchain. `token` has to belong to the device the
    /// swapchain was created on, and that device has to still be live.
    pub fn destroy(
        &mut self,
        backend: &impl Backend,
        token: &DeviceToken,
    ) -> Result<(), SwapchainError> {
        if !self.is_bound() {
            return Ok(());
        }
        if token.device() != self.device {
            return Err(SwapchainError::WrongDevice {
                bound: self.device,
                given: token.device(),
            });
        }
        if !token.is_live() {
            return Err(SwapchainError::DeviceNotLive(self.device));
        }

        debug!("Destroying swapchain.");
        backend.destroy_swapchain(self.device, self.swapchain);
        *self = Self::unbound();

        Ok(())
    }
}

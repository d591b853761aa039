//! Swapchain parameter negotiation.
//!
//! Everything in this module is pure: it turns what a surface reports
//! ([`SwapchainSupportDetails`]) plus the window's framebuffer size into a
//! [`SwapchainDesc`] that an [`ExecutionContext`](crate::context::ExecutionContext)
//! can create. Creation, recreation and teardown live in the renderer.
//!
//! Selection rules:
//! - format: `B8G8R8A8_SRGB` + `SRGB_NONLINEAR` if offered, else the first pair
//! - present mode: `MAILBOX` if offered, else `FIFO`
//! - extent: the surface's current extent, unless it is the `u32::MAX`
//!   sentinel, in which case the framebuffer size clamped to the surface limits
//! - image count: one more than the minimum, capped by a non-zero maximum

use ash::vk;
use tracing::{debug, warn};

use crate::context::{ImageSharing, QueueFamilyPair, SwapchainDesc};
use crate::error::{RhiError, RhiResult};

/// Width reported in `current_extent` when the surface size follows the swapchain.
pub const EXTENT_FROM_SWAPCHAIN: u32 = u32::MAX;

/// Swapchain surface support details.
#[derive(Debug, Clone, Default)]
pub struct SwapchainSupportDetails {
    /// Surface capabilities (min/max image count, extents, transforms, etc.)
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats (format and color space combinations)
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes (FIFO, MAILBOX, IMMEDIATE, etc.)
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support details for a physical device and surface.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the queries fail.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };
        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };
        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count: {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            max_image_count_label(&capabilities)
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// At least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }

    /// Resolves the full set of swapchain parameters for `surface`.
    ///
    /// # Errors
    ///
    /// [`RhiError::SwapchainCreation`] when the surface offers no format or no
    /// present mode.
    pub fn negotiate(
        &self,
        surface: vk::SurfaceKHR,
        framebuffer_size: (u32, u32),
        families: QueueFamilyPair,
    ) -> RhiResult<SwapchainDesc> {
        let surface_format = choose_surface_format(&self.formats).ok_or_else(|| {
            RhiError::SwapchainCreation("surface reports no supported formats".to_string())
        })?;

        if self.present_modes.is_empty() {
            return Err(RhiError::SwapchainCreation(
                "surface reports no present modes".to_string(),
            ));
        }
        let present_mode = choose_present_mode(&self.present_modes);

        let (width, height) = framebuffer_size;
        let extent = choose_extent(&self.capabilities, width, height);

        Ok(SwapchainDesc {
            surface,
            surface_format,
            present_mode,
            extent,
            min_image_count: determine_image_count(&self.capabilities),
            pre_transform: self.capabilities.current_transform,
            sharing: ImageSharing::for_families(families),
        })
    }
}

fn max_image_count_label(capabilities: &vk::SurfaceCapabilitiesKHR) -> String {
    if capabilities.max_image_count == 0 {
        "unlimited".to_string()
    } else {
        capabilities.max_image_count.to_string()
    }
}

/// Chooses the surface format.
///
/// Prefers `B8G8R8A8_SRGB` with `SRGB_NONLINEAR` wherever it appears in the
/// list, otherwise the first entry. `None` only for an empty list.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    let preferred = formats.iter().find(|f| {
        f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    });

    if let Some(&format) = preferred {
        debug!("Selected preferred surface format: B8G8R8A8_SRGB with SRGB_NONLINEAR");
        return Some(format);
    }

    let first = formats.first().copied()?;
    warn!(
        "Preferred surface format unavailable, using {:?} / {:?}",
        first.format, first.color_space
    );
    Some(first)
}

/// Chooses the present mode: `MAILBOX` when offered, otherwise `FIFO`, which
/// every conforming implementation supports.
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        debug!("Selected MAILBOX present mode");
        return vk::PresentModeKHR::MAILBOX;
    }

    debug!("Selected FIFO present mode");
    vk::PresentModeKHR::FIFO
}

/// Chooses the swapchain extent.
///
/// A defined current extent is used verbatim. The sentinel width means the
/// swapchain decides, so the framebuffer size is clamped to the surface's
/// min/max extents component-wise.
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != EXTENT_FROM_SWAPCHAIN {
        debug!(
            "Using current surface extent: {}x{}",
            capabilities.current_extent.width, capabilities.current_extent.height
        );
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    // Not `clamp`: a driver may report min > max.
    let extent = vk::Extent2D {
        width: width.max(min.width).min(max.width),
        height: height.max(min.height).min(max.height),
    };

    debug!(
        "Calculated extent: {}x{} (requested: {}x{}, min: {}x{}, max: {}x{})",
        extent.width, extent.height, width, height, min.width, min.height, max.width, max.height
    );

    extent
}

/// Requests one image beyond the minimum, capped by `max_image_count` when it
/// is non-zero (zero means unbounded).
pub fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count.saturating_add(1);

    let image_count = if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    };

    debug!(
        "Image count: {} (min: {}, max: {})",
        image_count,
        capabilities.min_image_count,
        max_image_count_label(capabilities)
    );

    image_count
}

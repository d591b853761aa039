//! Vulkan surfaces for winit windows.

use std::ffi::{CStr, c_char};
use std::sync::Arc;

use ash::vk;
use raw_window_handle::RawDisplayHandle;
use winit::window::Window as WinitWindow;

use swapframe_rhi::context::PresentSurface;
use swapframe_rhi::swapchain::SwapchainSupportDetails;
use swapframe_rhi::{RhiError, RhiResult};

use crate::Window;

/// RAII wrapper for a Vulkan surface.
///
/// The instance that created the surface must outlive it.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Create a Vulkan surface for `window`.
    ///
    /// # Errors
    ///
    /// [`RhiError::SurfaceError`] if the window handles are unavailable or
    /// surface creation fails.
    pub fn new(entry: &ash::Entry, instance: &ash::Instance, window: &Window) -> RhiResult<Self> {
        let display_handle = window
            .display_handle()
            .map_err(|e| RhiError::SurfaceError(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| RhiError::SurfaceError(format!("Failed to get window handle: {e}")))?;

        // SAFETY: entry and instance are valid; the handles come from a live
        // winit window. The surface is destroyed in `Drop`.
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| RhiError::SurfaceError(format!("Failed to create Vulkan surface: {e}")))?
        };

        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        tracing::info!("Vulkan surface created");

        Ok(Self {
            handle,
            surface_loader,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Surface extension loader, for capability queries.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: the handle was created by ash_window::create_surface from the
        // same instance as the loader, and is destroyed only here.
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        tracing::debug!("Vulkan surface destroyed");
    }
}

/// A surface bound to the physical device and window it presents for.
pub struct WindowSurface {
    surface: Surface,
    physical_device: vk::PhysicalDevice,
    window: Arc<WinitWindow>,
}

impl WindowSurface {
    pub fn new(surface: Surface, physical_device: vk::PhysicalDevice, window: Arc<WinitWindow>) -> Self {
        Self {
            surface,
            physical_device,
            window,
        }
    }
}

impl PresentSurface for WindowSurface {
    #[inline]
    fn handle(&self) -> vk::SurfaceKHR {
        self.surface.handle()
    }

    fn support(&self) -> RhiResult<SwapchainSupportDetails> {
        SwapchainSupportDetails::query(self.physical_device, self.surface.handle(), self.surface.loader())
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

/// Instance extensions required to create a surface on this display.
///
/// The returned pointers are static strings owned by `ash_window`.
///
/// # Errors
///
/// Returns an error if the display is not supported.
pub fn required_extensions(display_handle: RawDisplayHandle) -> RhiResult<&'static [*const c_char]> {
    let extensions = ash_window::enumerate_required_extensions(display_handle)?;

    tracing::debug!(
        "Required Vulkan extensions for surface: {:?}",
        extensions
            .iter()
            // SAFETY: ash_window returns valid, null-terminated static strings.
            .map(|&ext| unsafe { CStr::from_ptr(ext) })
            .collect::<Vec<_>>()
    );

    Ok(extensions)
}

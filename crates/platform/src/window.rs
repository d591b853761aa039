//! Window management using winit.

use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use swapframe_core::{Error, Result, WindowConfig};

/// A winit window plus the handles needed to create a Vulkan surface for it.
pub struct Window {
    window: Arc<WinitWindow>,
}

impl Window {
    /// Create a window from its configuration.
    pub fn new(event_loop: &ActiveEventLoop, config: &WindowConfig) -> Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;

        tracing::info!(
            "Window created: {}x{} '{}' (resizable: {})",
            config.width,
            config.height,
            config.title,
            config.resizable
        );

        Ok(Self {
            window: Arc::new(window),
        })
    }

    /// Get a reference to the underlying winit window.
    pub fn inner(&self) -> &WinitWindow {
        &self.window
    }

    /// Get an Arc reference to the underlying winit window.
    pub fn inner_arc(&self) -> Arc<WinitWindow> {
        Arc::clone(&self.window)
    }

    /// Current framebuffer size in pixels. `(0, 0)` while minimized.
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    pub fn display_handle(
        &self,
    ) -> std::result::Result<raw_window_handle::DisplayHandle<'_>, raw_window_handle::HandleError>
    {
        self.window.display_handle()
    }

    pub fn window_handle(
        &self,
    ) -> std::result::Result<raw_window_handle::WindowHandle<'_>, raw_window_handle::HandleError>
    {
        self.window.window_handle()
    }

    /// Request a redraw of the window.
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

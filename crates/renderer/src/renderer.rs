//! Vulkan bring-up around the frame loop.
//!
//! [`Renderer`] creates the instance, surface, physical and logical device for
//! a window and hands them to a [`FrameOrchestrator`] drawing the triangle
//! pipeline.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use swapframe_core::RendererConfig;
use swapframe_platform::{Surface, Window, WindowSurface, required_extensions};
use swapframe_rhi::RhiError;
use swapframe_rhi::device::Device;
use swapframe_rhi::instance::Instance;
use swapframe_rhi::physical_device::select_physical_device;

use crate::error::{RenderError, RenderResult};
use crate::orchestrator::{FrameOrchestrator, FrameOutcome, FrameSettings};
use crate::pipeline::TrianglePipeline;

/// Renderer for a single window.
///
/// # Resource Destruction Order
///
/// 1. Frame loop: idles the device, then releases sync objects, command pool,
///    framebuffers, pipeline, image views and swapchain
/// 2. Logical device
/// 3. Surface
/// 4. Instance
pub struct Renderer {
    frames: FrameOrchestrator<Device, WindowSurface, TrianglePipeline>,
    device: Arc<Device>,
    // Last reference once `frames` is gone.
    surface: Arc<WindowSurface>,
    instance: Instance,
    gpu_name: String,
}

impl Renderer {
    /// Initializes Vulkan for `window`.
    ///
    /// # Errors
    ///
    /// [`RenderError::Startup`] naming the object that could not be created.
    pub fn new(window: &Window, config: &RendererConfig) -> RenderResult<Self> {
        let display = window
            .display_handle()
            .map_err(|e| RenderError::startup("surface")(RhiError::SurfaceError(e.to_string())))?;
        let extensions =
            required_extensions(display.as_raw()).map_err(RenderError::startup("instance"))?;

        let instance = Instance::new(c"swapframe", extensions, config.validation)
            .map_err(RenderError::startup("instance"))?;

        let surface = Surface::new(instance.entry(), instance.handle(), window)
            .map_err(RenderError::startup("surface"))?;

        let gpu = select_physical_device(instance.handle(), surface.handle(), surface.loader())
            .map_err(RenderError::startup("physical device"))?;
        let device = Device::new(&instance, &gpu).map_err(RenderError::startup("device"))?;

        let surface = Arc::new(WindowSurface::new(surface, gpu.device, window.inner_arc()));

        let pipeline_device = Arc::clone(&device);
        let frames = FrameOrchestrator::new(
            Arc::clone(&device),
            Arc::clone(&surface),
            FrameSettings::from(config),
            |format| {
                TrianglePipeline::new(pipeline_device, format, config)
                    .map_err(RenderError::startup("pipeline"))
            },
        )?;

        let gpu_name = gpu.device_name().to_owned();
        info!("Renderer initialized on '{}'", gpu_name);

        Ok(Self {
            frames,
            device,
            surface,
            instance,
            gpu_name,
        })
    }

    /// Renders and presents one frame. See [`FrameOrchestrator::render_frame`].
    pub fn render_frame(&mut self) -> RenderResult<FrameOutcome> {
        self.frames.render_frame()
    }

    /// Rebuilds the swapchain before the next frame.
    pub fn request_recreate(&mut self) {
        self.frames.request_recreate();
    }

    /// Idles the device and releases the frame loop. Idempotent.
    ///
    /// The device and instance are released when the renderer is dropped.
    pub fn shutdown(&mut self) -> RenderResult<()> {
        self.frames.shutdown()
    }

    pub fn frames(&self) -> &FrameOrchestrator<Device, WindowSurface, TrianglePipeline> {
        &self.frames
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    #[inline]
    pub fn has_validation(&self) -> bool {
        self.instance.has_validation()
    }

    pub fn gpu_name(&self) -> &str {
        &self.gpu_name
    }

    /// Current swapchain extent, zero after shutdown.
    pub fn extent(&self) -> vk::Extent2D {
        self.frames
            .swapchain()
            .map_or(vk::Extent2D::default(), |swapchain| swapchain.extent())
    }

    /// Current swapchain format, `UNDEFINED` after shutdown.
    pub fn format(&self) -> vk::Format {
        self.frames
            .swapchain()
            .map_or(vk::Format::UNDEFINED, |swapchain| swapchain.format())
    }
}

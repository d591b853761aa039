//! Swapchain lifecycle: creation from negotiated surface state, recreation
//! with the previous swapchain as a hint, and retirement.
//!
//! A [`SwapchainState`] owns the swapchain handle together with one view per
//! image. Dropping it destroys the views first and the swapchain last. The
//! caller is responsible for draining the GPU before a state is dropped.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use swapframe_rhi::context::{ExecutionContext, PresentSurface};
use swapframe_rhi::image::ImageView;
use swapframe_rhi::{RhiError, RhiResult};

/// A live swapchain and the views over its images.
pub struct SwapchainState<C: ExecutionContext> {
    // Dropped explicitly before the swapchain in `Drop`.
    views: Vec<ImageView<C>>,
    images: Vec<vk::Image>,
    handle: vk::SwapchainKHR,
    surface_format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    generation: u64,
    context: Arc<C>,
}

impl<C: ExecutionContext> SwapchainState<C> {
    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.surface_format.format
    }

    #[inline]
    pub fn color_space(&self) -> vk::ColorSpaceKHR {
        self.surface_format.color_space
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Number of images the implementation actually created.
    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// One view per image, in image-index order.
    pub fn views(&self) -> &[ImageView<C>] {
        &self.views
    }

    /// Increases by one with every swapchain the manager creates.
    ///
    /// An image index is only meaningful together with the generation it was
    /// acquired from.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<C: ExecutionContext> Drop for SwapchainState<C> {
    fn drop(&mut self) {
        self.views.clear();
        self.context.destroy_swapchain(self.handle);
        debug!(
            "Swapchain generation {} destroyed ({:?})",
            self.generation, self.handle
        );
    }
}

/// Creates swapchains for one surface.
pub struct SwapchainManager<C: ExecutionContext, S: PresentSurface> {
    context: Arc<C>,
    surface: Arc<S>,
    next_generation: u64,
}

impl<C: ExecutionContext, S: PresentSurface> SwapchainManager<C, S> {
    pub fn new(context: Arc<C>, surface: Arc<S>) -> Self {
        Self {
            context,
            surface,
            next_generation: 1,
        }
    }

    #[inline]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Current framebuffer size of the window behind the surface.
    pub fn framebuffer_size(&self) -> (u32, u32) {
        self.surface.framebuffer_size()
    }

    /// Queries the surface as it is now and builds a swapchain for it.
    ///
    /// When `previous` is given its handle is passed as `oldSwapchain`. The
    /// previous state stays valid and must still be retired by the caller.
    ///
    /// # Errors
    ///
    /// [`RhiError::SwapchainCreation`] for any failure along the way. Anything
    /// created before the failure is released.
    pub fn create(&mut self, previous: Option<&SwapchainState<C>>) -> RhiResult<SwapchainState<C>> {
        let support = self.surface.support().map_err(creation_error)?;
        let desc = support.negotiate(
            self.surface.handle(),
            self.surface.framebuffer_size(),
            self.context.queue_families(),
        )?;

        let old = previous.map_or(vk::SwapchainKHR::null(), SwapchainState::handle);
        let handle = self
            .context
            .create_swapchain(&desc, old)
            .map_err(creation_error)?;

        // From here on `state` owns the handle, so an early return cleans up.
        let mut state = SwapchainState {
            views: Vec::new(),
            images: Vec::new(),
            handle,
            surface_format: desc.surface_format,
            present_mode: desc.present_mode,
            extent: desc.extent,
            generation: self.next_generation,
            context: Arc::clone(&self.context),
        };
        self.next_generation += 1;

        state.images = self
            .context
            .swapchain_images(handle)
            .map_err(creation_error)?;
        state.views.reserve(state.images.len());
        for &image in &state.images {
            let view = ImageView::new(Arc::clone(&self.context), image, state.format())
                .map_err(creation_error)?;
            state.views.push(view);
        }

        info!(
            "Swapchain generation {} created: {} images, {}x{}, {:?}, {:?}",
            state.generation,
            state.images.len(),
            state.extent.width,
            state.extent.height,
            state.surface_format.format,
            state.present_mode
        );

        Ok(state)
    }

    /// Destroys a state that is no longer presented from.
    pub fn retire(&self, state: SwapchainState<C>) {
        debug!("Retiring swapchain generation {}", state.generation);
        drop(state);
    }
}

fn creation_error(error: RhiError) -> RhiError {
    match error {
        RhiError::SwapchainCreation(_) => error,
        other => RhiError::SwapchainCreation(other.to_string()),
    }
}

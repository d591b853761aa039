//! Image views and framebuffers over swapchain images.

use std::sync::Arc;

use ash::vk;
use tracing::trace;

use crate::context::ExecutionContext;
use crate::error::RhiResult;

/// 2D color view of a single swapchain image (one mip, one layer, identity swizzle).
pub struct ImageView<C: ExecutionContext> {
    context: Arc<C>,
    view: vk::ImageView,
}

impl<C: ExecutionContext> ImageView<C> {
    pub fn new(context: Arc<C>, image: vk::Image, format: vk::Format) -> RhiResult<Self> {
        let view = context.create_image_view(image, format)?;
        trace!("Created image view {:?} for {:?}", view, image);
        Ok(Self { context, view })
    }

    #[inline]
    pub fn handle(&self) -> vk::ImageView {
        self.view
    }
}

impl<C: ExecutionContext> Drop for ImageView<C> {
    fn drop(&mut self) {
        self.context.destroy_image_view(self.view);
        trace!("Destroyed image view {:?}", self.view);
    }
}

/// Single-attachment framebuffer binding an image view to a render pass.
pub struct Framebuffer<C: ExecutionContext> {
    context: Arc<C>,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
}

impl<C: ExecutionContext> Framebuffer<C> {
    pub fn new(
        context: Arc<C>,
        render_pass: vk::RenderPass,
        view: &ImageView<C>,
        extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        let framebuffer = context.create_framebuffer(render_pass, view.handle(), extent)?;
        trace!("Created framebuffer {:?}", framebuffer);
        Ok(Self {
            context,
            framebuffer,
            extent,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl<C: ExecutionContext> Drop for Framebuffer<C> {
    fn drop(&mut self) {
        self.context.destroy_framebuffer(self.framebuffer);
        trace!("Destroyed framebuffer {:?}", self.framebuffer);
    }
}

//! Single-subpass render pass that clears a swapchain image and leaves it
//! ready for presentation.
//!
//! The attachment goes `UNDEFINED -> COLOR_ATTACHMENT_OPTIMAL -> PRESENT_SRC_KHR`
//! through the pass itself, so no explicit barrier is recorded around it. The
//! external dependency orders the layout transition after the
//! `COLOR_ATTACHMENT_OUTPUT` stage that waits on the image-acquired semaphore.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

pub struct RenderPass {
    device: Arc<Device>,
    render_pass: vk::RenderPass,
    color_format: vk::Format,
}

impl RenderPass {
    /// Creates a render pass rendering into one attachment of `color_format`.
    pub fn new(device: Arc<Device>, color_format: vk::Format) -> RhiResult<Self> {
        let color_attachment = color_attachment_description(color_format);

        let color_attachment_ref = vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(std::slice::from_ref(&color_attachment_ref));

        let dependency = acquire_dependency();

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(std::slice::from_ref(&color_attachment))
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        let render_pass = unsafe { device.handle().create_render_pass(&create_info, None)? };

        debug!("Render pass created for {:?}", color_format);

        Ok(Self {
            device,
            render_pass,
            color_format,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Format the pass was created for. Framebuffers must use views of this format.
    #[inline]
    pub fn color_format(&self) -> vk::Format {
        self.color_format
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_render_pass(self.render_pass, None);
        }
        debug!("Render pass destroyed");
    }
}

fn color_attachment_description(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
}

fn acquire_dependency() -> vk::SubpassDependency {
    vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_attachment_clears_and_ends_presentable() {
        let attachment = color_attachment_description(vk::Format::B8G8R8A8_SRGB);
        assert_eq!(attachment.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(attachment.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(attachment.initial_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(attachment.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn test_dependency_waits_on_color_output() {
        let dependency = acquire_dependency();
        assert_eq!(dependency.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(dependency.dst_subpass, 0);
        assert_eq!(
            dependency.src_stage_mask,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert!(
            dependency
                .dst_access_mask
                .contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        );
    }
}

//! Vulkan logical device and queue management.
//!
//! [`Device`] owns the `VkDevice`, its graphics and present queues and the
//! swapchain extension loader. It is the Vulkan implementation of
//! [`ExecutionContext`].
//!
//! # Example
//!
//! ```no_run
//! use swapframe_rhi::device::Device;
//! use swapframe_rhi::instance::Instance;
//! use swapframe_rhi::physical_device::select_physical_device;
//! use ash::vk;
//!
//! let instance = Instance::new(c"swapframe", &[], false).expect("Failed to create instance");
//! let surface: vk::SurfaceKHR = vk::SurfaceKHR::null(); // placeholder
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//!
//! let info = select_physical_device(instance.handle(), surface, &surface_loader)
//!     .expect("No suitable GPU found");
//! let device = Device::new(&instance, &info).expect("Failed to create logical device");
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info};

use crate::context::{
    ExecutionContext, FrameSubmit, ImageSharing, QueueFamilyPair, RenderPassBegin, SwapchainDesc,
};
use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::physical_device::{DEVICE_EXTENSIONS, PhysicalDeviceInfo, QueueFamilyIndices};

/// Vulkan logical device wrapper. Shared across the renderer through `Arc`.
pub struct Device {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    swapchain_loader: ash::khr::swapchain::Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    queue_families: QueueFamilyPair,
}

impl Device {
    /// Creates a logical device with one queue per unique family and the
    /// swapchain extension enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if device creation fails.
    pub fn new(instance: &Instance, info: &PhysicalDeviceInfo) -> Result<Arc<Self>, RhiError> {
        let queue_families = info.queue_families;
        let unique_families = QueueFamilyIndices {
            graphics_family: Some(queue_families.graphics),
            present_family: Some(queue_families.present),
        }
        .unique_families();
        let queue_priorities = [1.0f32];

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let extension_names: Vec<*const std::ffi::c_char> =
            DEVICE_EXTENSIONS.iter().map(|ext| ext.as_ptr()).collect();

        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(info.device, &create_info, None)?
        };

        info!(
            "Logical device created with {} extension(s)",
            DEVICE_EXTENSIONS.len()
        );

        let graphics_queue = unsafe { device.get_device_queue(queue_families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(queue_families.present, 0) };
        debug!(
            "Queues retrieved: graphics family {}, present family {}",
            queue_families.graphics, queue_families.present
        );

        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), &device);

        Ok(Arc::new(Self {
            device,
            physical_device: info.device,
            swapchain_loader,
            graphics_queue,
            present_queue,
            queue_families,
        }))
    }

    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }
}

fn swapchain_error(what: &str) -> impl FnOnce(vk::Result) -> RhiError + '_ {
    move |e| RhiError::SwapchainCreation(format!("{what}: {e}"))
}

impl ExecutionContext for Device {
    #[inline]
    fn queue_families(&self) -> QueueFamilyPair {
        self.queue_families
    }

    // ========================================================================
    // Swapchain
    // ========================================================================

    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: vk::SwapchainKHR,
    ) -> RhiResult<vk::SwapchainKHR> {
        let (sharing_mode, family_indices): (vk::SharingMode, &[u32]) = match &desc.sharing {
            ImageSharing::Exclusive => (vk::SharingMode::EXCLUSIVE, &[]),
            ImageSharing::Concurrent(families) => (vk::SharingMode::CONCURRENT, families),
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(desc.surface)
            .min_image_count(desc.min_image_count)
            .image_format(desc.surface_format.format)
            .image_color_space(desc.surface_format.color_space)
            .image_extent(desc.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(family_indices)
            .pre_transform(desc.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(desc.present_mode)
            .clipped(true)
            .old_swapchain(old);

        unsafe {
            self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(swapchain_error("vkCreateSwapchainKHR"))
        }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> RhiResult<Vec<vk::Image>> {
        unsafe {
            self.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(swapchain_error("vkGetSwapchainImagesKHR"))
        }
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool), vk::Result> {
        // ash maps VK_TIMEOUT and VK_NOT_READY to Err, VK_SUBOPTIMAL_KHR to Ok(_, true).
        unsafe {
            self.swapchain_loader
                .acquire_next_image(swapchain, timeout, semaphore, vk::Fence::null())
        }
    }

    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<bool, vk::Result> {
        let wait_semaphores = [wait];
        let swapchains = [swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            self.swapchain_loader
                .queue_present(self.present_queue, &present_info)
        }
    }

    // ========================================================================
    // Images
    // ========================================================================

    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> RhiResult<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        unsafe {
            self.device
                .create_image_view(&create_info, None)
                .map_err(swapchain_error("vkCreateImageView"))
        }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> RhiResult<vk::Framebuffer> {
        let attachments = [view];
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        unsafe {
            self.device
                .create_framebuffer(&create_info, None)
                .map_err(swapchain_error("vkCreateFramebuffer"))
        }
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) };
    }

    // ========================================================================
    // Synchronization
    // ========================================================================

    fn create_semaphore(&self) -> RhiResult<vk::Semaphore> {
        let create_info = vk::SemaphoreCreateInfo::default();
        Ok(unsafe { self.device.create_semaphore(&create_info, None)? })
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) };
    }

    fn create_fence(&self, signaled: bool) -> RhiResult<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        Ok(unsafe { self.device.create_fence(&create_info, None)? })
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) };
    }

    fn wait_for_fences(&self, fences: &[vk::Fence], timeout: u64) -> Result<(), vk::Result> {
        unsafe { self.device.wait_for_fences(fences, true, timeout) }
    }

    fn reset_fences(&self, fences: &[vk::Fence]) -> RhiResult<()> {
        unsafe { self.device.reset_fences(fences)? };
        Ok(())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn create_command_pool(&self, queue_family: u32) -> RhiResult<vk::CommandPool> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        Ok(unsafe { self.device.create_command_pool(&create_info, None)? })
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) };
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> RhiResult<Vec<vk::CommandBuffer>> {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);
        Ok(unsafe { self.device.allocate_command_buffers(&allocate_info)? })
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> RhiResult<()> {
        unsafe {
            self.device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?
        };
        Ok(())
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> RhiResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default();
        unsafe { self.device.begin_command_buffer(cmd, &begin_info)? };
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> RhiResult<()> {
        unsafe { self.device.end_command_buffer(cmd)? };
        Ok(())
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, begin: &RenderPassBegin) {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: begin.clear_color,
            },
        }];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(begin.render_pass)
            .framebuffer(begin.framebuffer)
            .render_area(begin.render_area)
            .clear_values(&clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE)
        };
    }

    fn cmd_bind_graphics_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline)
        };
    }

    fn cmd_set_viewport_and_scissor(&self, cmd: vk::CommandBuffer, extent: vk::Extent2D) {
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        unsafe {
            self.device.cmd_set_viewport(cmd, 0, &[viewport]);
            self.device.cmd_set_scissor(cmd, 0, &[scissor]);
        }
    }

    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        unsafe { self.device.cmd_draw(cmd, vertex_count, instance_count, 0, 0) };
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(cmd) };
    }

    // ========================================================================
    // Queues
    // ========================================================================

    fn submit_graphics(&self, submit: &FrameSubmit) -> RhiResult<()> {
        let wait_semaphores = [submit.wait_semaphore];
        let wait_stages = [submit.wait_stage];
        let command_buffers = [submit.command_buffer];
        let signal_semaphores = [submit.signal_semaphore];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .queue_submit(self.graphics_queue, &[submit_info], submit.fence)?
        };
        Ok(())
    }

    fn wait_idle(&self) -> RhiResult<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                error!("Failed to wait for device idle during drop: {:?}", e);
            }
            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// Safety: ash::Device and the swapchain loader are function tables plus a
// handle; queues are only used from the thread driving the frame loop.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_extensions_defined() {
        assert!(DEVICE_EXTENSIONS.contains(&ash::khr::swapchain::NAME));
    }

    #[test]
    fn test_device_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }
}

//! Seams between the frame loop and the GPU.
//!
//! [`ExecutionContext`] is everything the swapchain lifecycle and the frame
//! loop need from a logical device: object creation and destruction, command
//! recording, queue submission and presentation. [`PresentSurface`] is what
//! they need from the window system. [`crate::device::Device`] implements the
//! former on top of ash; tests implement both with in-memory fakes.
//!
//! Every object is passed around as a raw `vk` handle. Ownership lives in the
//! RAII wrappers ([`crate::sync`], [`crate::command`], [`crate::image`]), which
//! keep an `Arc` to the context so they can never outlive it.

use ash::vk;

use crate::error::RhiResult;
use crate::swapchain::SwapchainSupportDetails;

/// The graphics and present queue families of a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilyPair {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyPair {
    /// Both roles are served by the same family.
    #[inline]
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }
}

/// How swapchain images are shared between queue families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSharing {
    Exclusive,
    Concurrent([u32; 2]),
}

impl ImageSharing {
    pub fn for_families(families: QueueFamilyPair) -> Self {
        if families.is_shared() {
            Self::Exclusive
        } else {
            Self::Concurrent([families.graphics, families.present])
        }
    }
}

/// Fully negotiated swapchain parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub surface: vk::SurfaceKHR,
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub min_image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub sharing: ImageSharing,
}

/// Parameters for beginning a single-subpass render pass.
#[derive(Clone, Copy, Debug)]
pub struct RenderPassBegin {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub render_area: vk::Rect2D,
    pub clear_color: [f32; 4],
}

/// One graphics queue submission of a recorded frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameSubmit {
    pub command_buffer: vk::CommandBuffer,
    pub wait_semaphore: vk::Semaphore,
    pub wait_stage: vk::PipelineStageFlags,
    pub signal_semaphore: vk::Semaphore,
    pub fence: vk::Fence,
}

/// Device-side operations consumed by the swapchain lifecycle and frame loop.
///
/// Implementations must be usable through a shared reference; objects are
/// externally synchronized by their single owner.
pub trait ExecutionContext {
    fn queue_families(&self) -> QueueFamilyPair;

    // ========================================================================
    // Swapchain
    // ========================================================================

    /// Creates a swapchain, passing `old` (possibly null) as `oldSwapchain`.
    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: vk::SwapchainKHR,
    ) -> RhiResult<vk::SwapchainKHR>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> RhiResult<Vec<vk::Image>>;
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    /// Acquires the next image, signaling `semaphore`.
    ///
    /// Returns the image index and whether the swapchain is suboptimal.
    /// `ERROR_OUT_OF_DATE_KHR` and `TIMEOUT` are reported as `Err`.
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool), vk::Result>;

    /// Presents `image_index` on the present queue after `wait` signals.
    ///
    /// Returns whether the swapchain is suboptimal.
    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<bool, vk::Result>;

    // ========================================================================
    // Images
    // ========================================================================

    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> RhiResult<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);
    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> RhiResult<vk::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    // ========================================================================
    // Synchronization
    // ========================================================================

    fn create_semaphore(&self) -> RhiResult<vk::Semaphore>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);
    fn create_fence(&self, signaled: bool) -> RhiResult<vk::Fence>;
    fn destroy_fence(&self, fence: vk::Fence);

    /// Waits until every fence is signaled. A timeout is `Err(vk::Result::TIMEOUT)`.
    fn wait_for_fences(&self, fences: &[vk::Fence], timeout: u64) -> Result<(), vk::Result>;
    fn reset_fences(&self, fences: &[vk::Fence]) -> RhiResult<()>;

    // ========================================================================
    // Commands
    // ========================================================================

    /// Creates a pool whose buffers can be reset individually.
    fn create_command_pool(&self, queue_family: u32) -> RhiResult<vk::CommandPool>;
    fn destroy_command_pool(&self, pool: vk::CommandPool);
    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> RhiResult<Vec<vk::CommandBuffer>>;

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> RhiResult<()>;
    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> RhiResult<()>;
    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> RhiResult<()>;
    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, begin: &RenderPassBegin);
    fn cmd_bind_graphics_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline);
    fn cmd_set_viewport_and_scissor(&self, cmd: vk::CommandBuffer, extent: vk::Extent2D);
    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32);
    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer);

    // ========================================================================
    // Queues
    // ========================================================================

    fn submit_graphics(&self, submit: &FrameSubmit) -> RhiResult<()>;
    fn wait_idle(&self) -> RhiResult<()>;
}

/// A presentation target: a surface plus what the window knows about its size.
pub trait PresentSurface {
    fn handle(&self) -> vk::SurfaceKHR;

    /// Current capabilities, formats and present modes for this surface.
    fn support(&self) -> RhiResult<SwapchainSupportDetails>;

    /// Framebuffer size in pixels. `(0, 0)` while minimized.
    fn framebuffer_size(&self) -> (u32, u32);
}

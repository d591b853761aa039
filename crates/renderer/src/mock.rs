//! In-memory [`ExecutionContext`] and [`PresentSurface`] for frame-loop tests.
//!
//! Handles are fabricated from a counter. The context tracks fence and
//! semaphore states the way a driver would and records every protocol
//! violation it can observe, so tests assert on them after the fact instead of
//! relying on validation layers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use ash::vk::{self, Handle};
use swapframe_rhi::context::{
    ExecutionContext, FrameSubmit, PresentSurface, QueueFamilyPair, RenderPassBegin,
    SwapchainDesc,
};
use swapframe_rhi::swapchain::SwapchainSupportDetails;
use swapframe_rhi::{RhiError, RhiResult};

use crate::recorder::GraphicsPipeline;

pub const MOCK_FORMAT: vk::Format = vk::Format::B8G8R8A8_SRGB;

const SURFACE_HANDLE: u64 = 0x5_0000;
const RENDER_PASS_HANDLE: u64 = 0x6_0000;
const PIPELINE_HANDLE: u64 = 0x7_0000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FenceState {
    Signaled,
    Unsignaled,
    /// Submitted work not yet observed complete.
    Pending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Swapchain,
    ImageView,
    Framebuffer,
    Semaphore,
    Fence,
    CommandPool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    CreateSwapchain {
        swapchain: vk::SwapchainKHR,
        old: vk::SwapchainKHR,
        desc: SwapchainDesc,
    },
    Acquire {
        swapchain: vk::SwapchainKHR,
        semaphore: vk::Semaphore,
        result: Result<(u32, bool), vk::Result>,
    },
    WaitFences(Vec<vk::Fence>),
    ResetFence(vk::Fence),
    ResetCommandBuffer(vk::CommandBuffer),
    BeginCommandBuffer(vk::CommandBuffer),
    EndCommandBuffer(vk::CommandBuffer),
    BeginRenderPass {
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_color: [f32; 4],
    },
    BindPipeline(vk::CommandBuffer, vk::Pipeline),
    SetViewportScissor(vk::CommandBuffer, vk::Extent2D),
    Draw {
        cmd: vk::CommandBuffer,
        vertex_count: u32,
        instance_count: u32,
    },
    EndRenderPass(vk::CommandBuffer),
    Submit {
        command_buffer: vk::CommandBuffer,
        wait_semaphore: vk::Semaphore,
        wait_stage: vk::PipelineStageFlags,
        signal_semaphore: vk::Semaphore,
        fence: vk::Fence,
    },
    Present {
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
        result: Result<bool, vk::Result>,
    },
    WaitIdle,
    Destroy(ObjectKind, u64),
    PipelineDropped,
}

#[derive(Default)]
struct MockState {
    next_handle: u64,
    live: HashMap<u64, ObjectKind>,
    fences: HashMap<u64, FenceState>,
    signaled_semaphores: HashSet<u64>,
    swapchain_images: HashMap<u64, Vec<u64>>,
    image_owner: HashMap<u64, u64>,
    view_image: HashMap<u64, u64>,
    framebuffer_view: HashMap<u64, u64>,
    /// Command buffer -> fence of its unfinished submission.
    pending_commands: HashMap<u64, u64>,
    next_image: HashMap<u64, u32>,
    acquire_calls: u32,
    present_calls: u32,
    acquire_script: HashMap<u32, vk::Result>,
    present_script: HashMap<u32, vk::Result>,
    fail_next_swapchain: bool,
    /// Bounded fence waits leave submitted work pending.
    gpu_busy: bool,
    events: Vec<Event>,
    violations: Vec<String>,
}

impl MockState {
    fn alloc(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn create(&mut self, kind: ObjectKind) -> u64 {
        let raw = self.alloc();
        self.live.insert(raw, kind);
        raw
    }

    fn destroy(&mut self, raw: u64, kind: ObjectKind) {
        match self.live.remove(&raw) {
            Some(live) if live == kind => {}
            Some(live) => self.violation(format!("{kind:?} destroy called on {live:?} {raw:#x}")),
            None => self.violation(format!("{kind:?} {raw:#x} destroyed twice or never created")),
        }
        self.events.push(Event::Destroy(kind, raw));
    }

    fn is_live(&self, raw: u64, kind: ObjectKind) -> bool {
        self.live.get(&raw) == Some(&kind)
    }

    fn violation(&mut self, message: String) {
        self.violations.push(message);
    }

    fn complete_fence(&mut self, raw: u64) {
        self.fences.insert(raw, FenceState::Signaled);
        self.pending_commands.retain(|_, fence| *fence != raw);
    }

    fn check_not_pending(&mut self, cmd: vk::CommandBuffer, what: &str) {
        if self.pending_commands.contains_key(&cmd.as_raw()) {
            self.violation(format!("{what} {cmd:?} while its submission is pending"));
        }
    }
}

/// Fake device. Objects are plain integers; state sits behind one mutex.
pub struct MockContext {
    families: QueueFamilyPair,
    state: Mutex<MockState>,
}

impl MockContext {
    pub fn new() -> Arc<Self> {
        Self::with_families(QueueFamilyPair {
            graphics: 0,
            present: 0,
        })
    }

    pub fn with_families(families: QueueFamilyPair) -> Arc<Self> {
        Arc::new(Self {
            families,
            state: Mutex::new(MockState::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the `call`-th acquisition (1-based) return `result`.
    /// `SUBOPTIMAL_KHR` succeeds with the suboptimal flag set.
    pub fn script_acquire(&self, call: u32, result: vk::Result) {
        self.state().acquire_script.insert(call, result);
    }

    /// Makes the `call`-th presentation (1-based) return `result`.
    pub fn script_present(&self, call: u32, result: vk::Result) {
        self.state().present_script.insert(call, result);
    }

    pub fn fail_next_swapchain(&self) {
        self.state().fail_next_swapchain = true;
    }

    /// While busy, waits with a finite timeout do not complete pending
    /// fences. Unbounded waits and `wait_idle` still do.
    pub fn set_gpu_busy(&self, busy: bool) {
        self.state().gpu_busy = busy;
    }

    pub fn record(&self, event: Event) {
        self.state().events.push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    pub fn clear_events(&self) {
        self.state().events.clear();
    }

    pub fn violations(&self) -> Vec<String> {
        self.state().violations.clone()
    }

    pub fn live_objects(&self) -> usize {
        self.state().live.len()
    }

    pub fn live_of(&self, kind: ObjectKind) -> usize {
        self.state().live.values().filter(|&&k| k == kind).count()
    }

    pub fn fence_state(&self, fence: vk::Fence) -> Option<FenceState> {
        self.state().fences.get(&fence.as_raw()).copied()
    }

    pub fn acquire_calls(&self) -> u32 {
        self.state().acquire_calls
    }
}

impl ExecutionContext for MockContext {
    fn queue_families(&self) -> QueueFamilyPair {
        self.families
    }

    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: vk::SwapchainKHR,
    ) -> RhiResult<vk::SwapchainKHR> {
        let mut s = self.state();
        if s.fail_next_swapchain {
            s.fail_next_swapchain = false;
            return Err(RhiError::SwapchainCreation("scripted failure".to_string()));
        }
        if old != vk::SwapchainKHR::null() && !s.is_live(old.as_raw(), ObjectKind::Swapchain) {
            s.violation(format!("old swapchain {old:?} is not live"));
        }

        let raw = s.create(ObjectKind::Swapchain);
        let images: Vec<u64> = (0..desc.min_image_count).map(|_| s.alloc()).collect();
        for &image in &images {
            s.image_owner.insert(image, raw);
        }
        s.swapchain_images.insert(raw, images);

        let swapchain = vk::SwapchainKHR::from_raw(raw);
        s.events.push(Event::CreateSwapchain {
            swapchain,
            old,
            desc: *desc,
        });
        Ok(swapchain)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> RhiResult<Vec<vk::Image>> {
        let s = self.state();
        let images = s
            .swapchain_images
            .get(&swapchain.as_raw())
            .ok_or(RhiError::VulkanError(vk::Result::ERROR_INITIALIZATION_FAILED))?;
        Ok(images.iter().map(|&raw| vk::Image::from_raw(raw)).collect())
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut s = self.state();
        let raw = swapchain.as_raw();
        if s.fences.values().any(|&f| f == FenceState::Pending) {
            s.violation(format!("swapchain {raw:#x} destroyed while GPU work is pending"));
        }
        let views_alive = s
            .view_image
            .values()
            .any(|image| s.image_owner.get(image) == Some(&raw));
        if views_alive {
            s.violation(format!("swapchain {raw:#x} destroyed before its image views"));
        }
        s.destroy(raw, ObjectKind::Swapchain);
        s.swapchain_images.remove(&raw);
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        _timeout: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool), vk::Result> {
        let mut s = self.state();
        s.acquire_calls += 1;
        let call = s.acquire_calls;
        let raw = swapchain.as_raw();
        if !s.is_live(raw, ObjectKind::Swapchain) {
            s.violation(format!("acquire from dead swapchain {raw:#x}"));
        }

        let result = match s.acquire_script.remove(&call) {
            Some(vk::Result::SUBOPTIMAL_KHR) => Ok(true),
            Some(error) => Err(error),
            None => Ok(false),
        };
        let result = match result {
            Ok(suboptimal) => {
                if !s.signaled_semaphores.insert(semaphore.as_raw()) {
                    s.violation(format!("acquire semaphore {semaphore:?} already signaled"));
                }
                let count = s.swapchain_images.get(&raw).map_or(1, |v| v.len() as u32);
                let next = s.next_image.entry(raw).or_insert(0);
                let index = *next % count.max(1);
                *next += 1;
                Ok((index, suboptimal))
            }
            Err(error) => Err(error),
        };

        s.events.push(Event::Acquire {
            swapchain,
            semaphore,
            result,
        });
        result
    }

    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<bool, vk::Result> {
        let mut s = self.state();
        s.present_calls += 1;
        let call = s.present_calls;
        let raw = swapchain.as_raw();
        let count = s.swapchain_images.get(&raw).map_or(0, |v| v.len() as u32);
        if image_index >= count {
            s.violation(format!("present of image {image_index} out of {count}"));
        }

        let result = match s.present_script.remove(&call) {
            Some(vk::Result::SUBOPTIMAL_KHR) => Ok(true),
            Some(error) => Err(error),
            None => Ok(false),
        };
        // A failed present leaves its wait semaphore signaled.
        if result.is_ok() && !s.signaled_semaphores.remove(&wait.as_raw()) {
            s.violation(format!("present waits on unsignaled semaphore {wait:?}"));
        }

        s.events.push(Event::Present {
            swapchain,
            image_index,
            wait,
            result,
        });
        result
    }

    fn create_image_view(&self, image: vk::Image, _format: vk::Format) -> RhiResult<vk::ImageView> {
        let mut s = self.state();
        let owner = s.image_owner.get(&image.as_raw()).copied();
        if !owner.is_some_and(|sc| s.is_live(sc, ObjectKind::Swapchain)) {
            s.violation(format!("view of image {image:?} with no live swapchain"));
        }
        let raw = s.create(ObjectKind::ImageView);
        s.view_image.insert(raw, image.as_raw());
        Ok(vk::ImageView::from_raw(raw))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        let mut s = self.state();
        let raw = view.as_raw();
        if s.framebuffer_view.values().any(|&v| v == raw) {
            s.violation(format!("image view {raw:#x} destroyed before its framebuffer"));
        }
        s.destroy(raw, ObjectKind::ImageView);
        s.view_image.remove(&raw);
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        view: vk::ImageView,
        _extent: vk::Extent2D,
    ) -> RhiResult<vk::Framebuffer> {
        let mut s = self.state();
        if !s.is_live(view.as_raw(), ObjectKind::ImageView) {
            s.violation(format!("framebuffer over dead view {view:?}"));
        }
        let raw = s.create(ObjectKind::Framebuffer);
        s.framebuffer_view.insert(raw, view.as_raw());
        Ok(vk::Framebuffer::from_raw(raw))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        let mut s = self.state();
        let raw = framebuffer.as_raw();
        s.destroy(raw, ObjectKind::Framebuffer);
        s.framebuffer_view.remove(&raw);
    }

    fn create_semaphore(&self) -> RhiResult<vk::Semaphore> {
        let raw = self.state().create(ObjectKind::Semaphore);
        Ok(vk::Semaphore::from_raw(raw))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        let mut s = self.state();
        let raw = semaphore.as_raw();
        s.destroy(raw, ObjectKind::Semaphore);
        s.signaled_semaphores.remove(&raw);
    }

    fn create_fence(&self, signaled: bool) -> RhiResult<vk::Fence> {
        let mut s = self.state();
        let raw = s.create(ObjectKind::Fence);
        let state = if signaled {
            FenceState::Signaled
        } else {
            FenceState::Unsignaled
        };
        s.fences.insert(raw, state);
        Ok(vk::Fence::from_raw(raw))
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        let mut s = self.state();
        let raw = fence.as_raw();
        if s.fences.get(&raw) == Some(&FenceState::Pending) {
            s.violation(format!("fence {raw:#x} destroyed with pending work"));
        }
        s.destroy(raw, ObjectKind::Fence);
        s.fences.remove(&raw);
    }

    fn wait_for_fences(&self, fences: &[vk::Fence], timeout: u64) -> Result<(), vk::Result> {
        let mut s = self.state();
        s.events.push(Event::WaitFences(fences.to_vec()));

        let stalled = s.gpu_busy && timeout != u64::MAX;
        let mut satisfied = true;
        for fence in fences {
            let raw = fence.as_raw();
            match s.fences.get(&raw).copied() {
                Some(FenceState::Pending) if stalled => satisfied = false,
                Some(FenceState::Pending | FenceState::Signaled) => s.complete_fence(raw),
                Some(FenceState::Unsignaled) => satisfied = false,
                None => s.violation(format!("wait on unknown fence {raw:#x}")),
            }
        }

        if satisfied {
            Ok(())
        } else {
            if timeout == u64::MAX {
                s.violation("unbounded wait on a fence nothing will signal".to_string());
            }
            Err(vk::Result::TIMEOUT)
        }
    }

    fn reset_fences(&self, fences: &[vk::Fence]) -> RhiResult<()> {
        let mut s = self.state();
        for fence in fences {
            let raw = fence.as_raw();
            if s.fences.get(&raw) == Some(&FenceState::Pending) {
                s.violation(format!("fence {raw:#x} reset with pending work"));
            }
            s.fences.insert(raw, FenceState::Unsignaled);
            s.events.push(Event::ResetFence(*fence));
        }
        Ok(())
    }

    fn create_command_pool(&self, _queue_family: u32) -> RhiResult<vk::CommandPool> {
        let raw = self.state().create(ObjectKind::CommandPool);
        Ok(vk::CommandPool::from_raw(raw))
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        let mut s = self.state();
        if !s.pending_commands.is_empty() {
            s.violation("command pool destroyed with pending command buffers".to_string());
        }
        s.destroy(pool.as_raw(), ObjectKind::CommandPool);
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> RhiResult<Vec<vk::CommandBuffer>> {
        let mut s = self.state();
        if !s.is_live(pool.as_raw(), ObjectKind::CommandPool) {
            s.violation(format!("allocation from dead pool {pool:?}"));
        }
        Ok((0..count)
            .map(|_| vk::CommandBuffer::from_raw(s.alloc()))
            .collect())
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> RhiResult<()> {
        let mut s = self.state();
        s.check_not_pending(cmd, "reset of command buffer");
        s.events.push(Event::ResetCommandBuffer(cmd));
        Ok(())
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> RhiResult<()> {
        let mut s = self.state();
        s.check_not_pending(cmd, "recording into command buffer");
        s.events.push(Event::BeginCommandBuffer(cmd));
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> RhiResult<()> {
        self.record(Event::EndCommandBuffer(cmd));
        Ok(())
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, begin: &RenderPassBegin) {
        self.record(Event::BeginRenderPass {
            cmd,
            render_pass: begin.render_pass,
            framebuffer: begin.framebuffer,
            render_area: begin.render_area,
            clear_color: begin.clear_color,
        });
    }

    fn cmd_bind_graphics_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.record(Event::BindPipeline(cmd, pipeline));
    }

    fn cmd_set_viewport_and_scissor(&self, cmd: vk::CommandBuffer, extent: vk::Extent2D) {
        self.record(Event::SetViewportScissor(cmd, extent));
    }

    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        self.record(Event::Draw {
            cmd,
            vertex_count,
            instance_count,
        });
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        self.record(Event::EndRenderPass(cmd));
    }

    fn submit_graphics(&self, submit: &FrameSubmit) -> RhiResult<()> {
        let mut s = self.state();
        let fence = submit.fence.as_raw();
        match s.fences.get(&fence).copied() {
            Some(FenceState::Unsignaled) => {}
            other => s.violation(format!("submit with fence {fence:#x} in state {other:?}")),
        }
        if !s.signaled_semaphores.remove(&submit.wait_semaphore.as_raw()) {
            s.violation(format!(
                "submit waits on unsignaled semaphore {:?}",
                submit.wait_semaphore
            ));
        }
        if !s.signaled_semaphores.insert(submit.signal_semaphore.as_raw()) {
            s.violation(format!(
                "submit signals already signaled semaphore {:?}",
                submit.signal_semaphore
            ));
        }
        s.fences.insert(fence, FenceState::Pending);
        s.pending_commands
            .insert(submit.command_buffer.as_raw(), fence);

        s.events.push(Event::Submit {
            command_buffer: submit.command_buffer,
            wait_semaphore: submit.wait_semaphore,
            wait_stage: submit.wait_stage,
            signal_semaphore: submit.signal_semaphore,
            fence: submit.fence,
        });
        Ok(())
    }

    fn wait_idle(&self) -> RhiResult<()> {
        let mut s = self.state();
        let pending: Vec<u64> = s
            .fences
            .iter()
            .filter(|(_, state)| **state == FenceState::Pending)
            .map(|(&raw, _)| raw)
            .collect();
        for raw in pending {
            s.complete_fence(raw);
        }
        s.events.push(Event::WaitIdle);
        Ok(())
    }
}

struct SurfaceState {
    support: SwapchainSupportDetails,
    framebuffer_size: (u32, u32),
}

/// Fake surface with a fixed-size 800x600 window by default.
pub struct MockSurface {
    state: Mutex<SurfaceState>,
}

impl MockSurface {
    pub fn new(present_modes: &[vk::PresentModeKHR]) -> Arc<Self> {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            current_extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        };
        let formats = vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: MOCK_FORMAT,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];

        Arc::new(Self {
            state: Mutex::new(SurfaceState {
                support: SwapchainSupportDetails {
                    capabilities,
                    formats,
                    present_modes: present_modes.to_vec(),
                },
                framebuffer_size: (800, 600),
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resizes the window; the surface's current extent follows it.
    pub fn set_framebuffer_size(&self, width: u32, height: u32) {
        let mut s = self.state();
        s.framebuffer_size = (width, height);
        s.support.capabilities.current_extent = vk::Extent2D { width, height };
    }

    pub fn set_min_image_count(&self, count: u32) {
        self.state().support.capabilities.min_image_count = count;
    }

    pub fn set_formats(&self, formats: Vec<vk::SurfaceFormatKHR>) {
        self.state().support.formats = formats;
    }
}

impl PresentSurface for MockSurface {
    fn handle(&self) -> vk::SurfaceKHR {
        vk::SurfaceKHR::from_raw(SURFACE_HANDLE)
    }

    fn support(&self) -> RhiResult<SwapchainSupportDetails> {
        Ok(self.state().support.clone())
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.state().framebuffer_size
    }
}

/// Stand-in for a compiled pipeline. Logs its own destruction.
pub struct MockPipeline {
    context: Arc<MockContext>,
    format: vk::Format,
}

impl MockPipeline {
    pub fn new(context: Arc<MockContext>, format: vk::Format) -> Self {
        Self { context, format }
    }
}

impl GraphicsPipeline for MockPipeline {
    fn render_pass(&self) -> vk::RenderPass {
        vk::RenderPass::from_raw(RENDER_PASS_HANDLE)
    }

    fn pipeline(&self) -> vk::Pipeline {
        vk::Pipeline::from_raw(PIPELINE_HANDLE)
    }

    fn color_format(&self) -> vk::Format {
        self.format
    }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        self.context.record(Event::PipelineDropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_flags_recording_while_pending() {
        let ctx = MockContext::new();
        let fence = ctx.create_fence(false).unwrap();
        let wait = ctx.create_semaphore().unwrap();
        let signal = ctx.create_semaphore().unwrap();
        let pool = ctx.create_command_pool(0).unwrap();
        let cmd = ctx.allocate_command_buffers(pool, 1).unwrap()[0];

        // Pretend an acquire signaled the wait semaphore.
        ctx.state().signaled_semaphores.insert(wait.as_raw());
        ctx.submit_graphics(&FrameSubmit {
            command_buffer: cmd,
            wait_semaphore: wait,
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: signal,
            fence,
        })
        .unwrap();
        assert!(ctx.violations().is_empty(), "{:?}", ctx.violations());

        ctx.begin_command_buffer(cmd).unwrap();
        assert_eq!(ctx.violations().len(), 1);

        ctx.wait_for_fences(&[fence], u64::MAX).unwrap();
        assert_eq!(ctx.fence_state(fence), Some(FenceState::Signaled));
        ctx.begin_command_buffer(cmd).unwrap();
        assert_eq!(ctx.violations().len(), 1);
    }

    #[test]
    fn test_mock_flags_double_destroy() {
        let ctx = MockContext::new();
        let semaphore = ctx.create_semaphore().unwrap();
        ctx.destroy_semaphore(semaphore);
        assert!(ctx.violations().is_empty());
        ctx.destroy_semaphore(semaphore);
        assert_eq!(ctx.violations().len(), 1);
        assert_eq!(ctx.live_objects(), 0);
    }

    #[test]
    fn test_mock_unsignaled_fence_times_out() {
        let ctx = MockContext::new();
        let fence = ctx.create_fence(false).unwrap();
        assert_eq!(
            ctx.wait_for_fences(&[fence], 1_000),
            Err(vk::Result::TIMEOUT)
        );
        assert!(ctx.violations().is_empty());
    }
}

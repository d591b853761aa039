//! The per-frame CPU/GPU protocol.
//!
//! [`FrameOrchestrator`] owns the swapchain, the framebuffers, the pipeline
//! and `N` [`FrameSlot`]s, and drives one frame per [`render_frame`] call:
//!
//! 1. wait on the current slot's fence
//! 2. acquire an image, signaling the slot's `image_acquired`
//! 3. reset the fence, then record into the slot's command buffer
//! 4. submit, waiting on `image_acquired` at color attachment output and
//!    signaling `render_complete` and the fence
//! 5. present, waiting on `render_complete`
//! 6. advance to the next slot
//!
//! Slots rotate independently of image indices. The fence is only reset once
//! an image was acquired, so an acquisition that fails leaves the slot's fence
//! signaled and the next call cannot deadlock on it.
//!
//! Recreation drains every slot and idles the device before any old resource
//! is touched, then rebuilds views and framebuffers for the new images.
//!
//! [`render_frame`]: FrameOrchestrator::render_frame

use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info, warn};

use swapframe_core::RendererConfig;
use swapframe_rhi::RhiResult;
use swapframe_rhi::command::CommandPool;
use swapframe_rhi::context::{ExecutionContext, FrameSubmit, PresentSurface};
use swapframe_rhi::image::Framebuffer;

use crate::error::{FrameStage, RenderError, RenderResult};
use crate::frame::{FrameSlot, SlotState};
use crate::recorder::{CommandRecorder, GraphicsPipeline, RenderTarget};
use crate::swapchain::{SwapchainManager, SwapchainState};

/// Frame loop parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSettings {
    /// Number of frame slots, at least one.
    pub frames_in_flight: usize,
    pub fence_timeout_ns: u64,
    pub acquire_timeout_ns: u64,
    pub clear_color: [f32; 4],
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            frames_in_flight: 1,
            fence_timeout_ns: u64::MAX,
            acquire_timeout_ns: u64::MAX,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl From<&RendererConfig> for FrameSettings {
    fn from(config: &RendererConfig) -> Self {
        Self {
            frames_in_flight: config.frames_in_flight,
            fence_timeout_ns: config.fence_timeout_ns,
            acquire_timeout_ns: config.acquire_timeout_ns,
            clear_color: config.clear_color,
        }
    }
}

/// What a [`FrameOrchestrator::render_frame`] call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was submitted and queued for presentation.
    Presented {
        slot: usize,
        image_index: u32,
        generation: u64,
    },
    /// The frame was submitted but presentation reported the swapchain out of
    /// date, so it was never shown. The swapchain was rebuilt.
    Discarded {
        slot: usize,
        image_index: u32,
        generation: u64,
    },
    /// Acquisition reported the swapchain out of date; it was rebuilt and
    /// nothing was drawn.
    SwapchainRebuilt,
    Skipped(SkipReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The slot's previous submission did not finish within the fence timeout.
    FenceTimeout,
    /// No image became available within the acquire timeout.
    AcquireTimeout,
    /// The window has a zero-sized framebuffer; recreation is deferred.
    SurfaceUnavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecreateOutcome {
    Rebuilt,
    /// The framebuffer is zero-sized. Recreation stays pending.
    Deferred,
    /// Submitted work did not finish within the fence timeout. Recreation
    /// stays pending.
    GpuBusy,
}

impl RecreateOutcome {
    /// Why a frame cannot be drawn after this outcome, if it can't.
    fn skip_reason(self) -> Option<SkipReason> {
        match self {
            Self::Rebuilt => None,
            Self::Deferred => Some(SkipReason::SurfaceUnavailable),
            Self::GpuBusy => Some(SkipReason::FenceTimeout),
        }
    }
}

/// An image index tagged with the swapchain generation it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcquiredImage {
    pub index: u32,
    pub generation: u64,
}

impl AcquiredImage {
    /// Fails unless the image belongs to `swapchain`.
    pub fn ensure_current<C: ExecutionContext>(
        &self,
        swapchain: &SwapchainState<C>,
    ) -> RenderResult<()> {
        if self.generation != swapchain.generation() {
            return Err(RenderError::contract(format!(
                "image {} from swapchain generation {} used with generation {}",
                self.index,
                self.generation,
                swapchain.generation()
            )));
        }
        if self.index as usize >= swapchain.image_count() {
            return Err(RenderError::contract(format!(
                "image index {} out of range for {} images",
                self.index,
                swapchain.image_count()
            )));
        }
        Ok(())
    }
}

/// Swapchain lifecycle plus frames-in-flight synchronization.
///
/// # Resource Destruction Order
///
/// Fields are declared so that implicit drops run sync objects, command
/// pool, framebuffers, pipeline (with its render pass), image views and
/// swapchain, in that order. [`shutdown`](Self::shutdown) idles the device
/// and releases them in the same order explicitly.
pub struct FrameOrchestrator<C, S, P>
where
    C: ExecutionContext,
    S: PresentSurface,
    P: GraphicsPipeline,
{
    slots: Vec<FrameSlot<C>>,
    command_pool: Option<CommandPool<C>>,
    framebuffers: Vec<Framebuffer<C>>,
    pipeline: Option<P>,
    swapchain: Option<SwapchainState<C>>,
    manager: SwapchainManager<C, S>,
    recorder: CommandRecorder,
    context: Arc<C>,
    settings: FrameSettings,
    current_slot: usize,
    needs_recreate: bool,
    frames_presented: u64,
    recreations: u64,
    torn_down: bool,
}

impl<C, S, P> FrameOrchestrator<C, S, P>
where
    C: ExecutionContext,
    S: PresentSurface,
    P: GraphicsPipeline,
{
    /// Creates the first swapchain, then builds the pipeline for its format
    /// with `make_pipeline`, the framebuffers and the frame slots.
    ///
    /// # Errors
    ///
    /// - [`RenderError::Startup`] if any object cannot be created
    /// - [`RenderError::FormatMismatch`] if the pipeline targets another format
    /// - [`RenderError::ContractViolation`] for zero frames in flight
    pub fn new<F>(
        context: Arc<C>,
        surface: Arc<S>,
        settings: FrameSettings,
        make_pipeline: F,
    ) -> RenderResult<Self>
    where
        F: FnOnce(vk::Format) -> RenderResult<P>,
    {
        if settings.frames_in_flight == 0 {
            return Err(RenderError::contract(
                "at least one frame in flight is required",
            ));
        }

        let mut manager = SwapchainManager::new(Arc::clone(&context), surface);
        let swapchain = manager
            .create(None)
            .map_err(RenderError::startup("swapchain"))?;

        let pipeline = make_pipeline(swapchain.format())?;
        ensure_format(&pipeline, &swapchain)?;

        let framebuffers = build_framebuffers(&context, pipeline.render_pass(), &swapchain)
            .map_err(RenderError::startup("framebuffers"))?;

        let command_pool = CommandPool::new(Arc::clone(&context), context.queue_families().graphics)
            .map_err(RenderError::startup("command pool"))?;
        let slot_count = u32::try_from(settings.frames_in_flight)
            .map_err(|_| RenderError::contract("frames in flight out of range"))?;
        let slots = command_pool
            .allocate_command_buffers(slot_count)
            .map_err(RenderError::startup("command buffers"))?
            .into_iter()
            .enumerate()
            .map(|(index, cmd)| FrameSlot::new(Arc::clone(&context), index, cmd))
            .collect::<RhiResult<Vec<_>>>()
            .map_err(RenderError::startup("frame synchronization"))?;

        info!(
            "Frame loop ready: {} frame(s) in flight over {} swapchain images",
            slots.len(),
            swapchain.image_count()
        );

        Ok(Self {
            slots,
            command_pool: Some(command_pool),
            framebuffers,
            pipeline: Some(pipeline),
            swapchain: Some(swapchain),
            manager,
            recorder: CommandRecorder::new(settings.clear_color),
            context,
            settings,
            current_slot: 0,
            needs_recreate: false,
            frames_presented: 0,
            recreations: 0,
            torn_down: false,
        })
    }

    /// Runs one frame cycle on the current slot.
    ///
    /// Out-of-date and suboptimal swapchains are handled here: the first
    /// rebuilds immediately and skips the frame, the second finishes the
    /// frame and rebuilds after presenting.
    ///
    /// # Errors
    ///
    /// Device or queue failures are fatal and reported with the
    /// [`FrameStage`] they came from.
    pub fn render_frame(&mut self) -> RenderResult<FrameOutcome> {
        if self.torn_down {
            return Err(RenderError::contract("render_frame called after shutdown"));
        }

        if self.needs_recreate {
            if let Some(reason) = self.recreate_swapchain()?.skip_reason() {
                return Ok(FrameOutcome::Skipped(reason));
            }
        }

        let slot_index = self.current_slot;
        let slot = self
            .slots
            .get_mut(slot_index)
            .ok_or_else(|| RenderError::contract(format!("no frame slot {slot_index}")))?;

        if !slot.wait_until_free(self.settings.fence_timeout_ns)? {
            warn!("Frame slot {} still busy after fence timeout", slot_index);
            return Ok(FrameOutcome::Skipped(SkipReason::FenceTimeout));
        }

        let swapchain = self
            .swapchain
            .as_ref()
            .ok_or_else(|| RenderError::contract("no swapchain to render to"))?;

        let acquired = self.context.acquire_next_image(
            swapchain.handle(),
            self.settings.acquire_timeout_ns,
            slot.image_acquired().handle(),
        );
        let (image_index, acquire_suboptimal) = match acquired {
            Ok(result) => result,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                slot.abort_acquire()?;
                debug!("Swapchain out of date at acquire");
                self.needs_recreate = true;
                return Ok(match self.recreate_swapchain()?.skip_reason() {
                    None => FrameOutcome::SwapchainRebuilt,
                    Some(reason) => FrameOutcome::Skipped(reason),
                });
            }
            Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => {
                slot.abort_acquire()?;
                debug!("No swapchain image available within the acquire timeout");
                return Ok(FrameOutcome::Skipped(SkipReason::AcquireTimeout));
            }
            Err(e) => return Err(RenderError::frame(FrameStage::Acquire)(e.into())),
        };

        let image = AcquiredImage {
            index: image_index,
            generation: swapchain.generation(),
        };
        image.ensure_current(swapchain)?;

        let framebuffer = self.framebuffers.get(image_index as usize).ok_or_else(|| {
            RenderError::contract(format!("no framebuffer for image {image_index}"))
        })?;
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| RenderError::contract("no pipeline to record with"))?;
        let target = RenderTarget {
            framebuffer: framebuffer.handle(),
            extent: swapchain.extent(),
        };

        let cmd = slot.begin_recording()?;
        self.recorder
            .record(cmd, &target, pipeline)
            .map_err(RenderError::frame(FrameStage::Record))?;
        let command_buffer = cmd.handle();

        self.context
            .submit_graphics(&FrameSubmit {
                command_buffer,
                wait_semaphore: slot.image_acquired().handle(),
                wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                signal_semaphore: slot.render_complete().handle(),
                fence: slot.fence().handle(),
            })
            .map_err(RenderError::frame(FrameStage::Submit))?;
        slot.mark_submitted()?;

        image.ensure_current(swapchain)?;
        let presented = self.context.queue_present(
            swapchain.handle(),
            image.index,
            slot.render_complete().handle(),
        );
        slot.mark_presenting()?;
        let (queued, present_stale) = match presented {
            Ok(suboptimal) => {
                self.frames_presented += 1;
                (true, suboptimal)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => (false, true),
            Err(e) => return Err(RenderError::frame(FrameStage::Present)(e.into())),
        };
        slot.complete()?;

        self.current_slot = (slot_index + 1) % self.slots.len();

        if acquire_suboptimal || present_stale {
            debug!(
                "Swapchain needs recreation (suboptimal acquire: {}, present: {:?})",
                acquire_suboptimal, presented
            );
            self.needs_recreate = true;
        }
        if self.needs_recreate {
            self.recreate_swapchain()?;
        }

        Ok(if queued {
            FrameOutcome::Presented {
                slot: slot_index,
                image_index: image.index,
                generation: image.generation,
            }
        } else {
            FrameOutcome::Discarded {
                slot: slot_index,
                image_index: image.index,
                generation: image.generation,
            }
        })
    }

    /// Asks for a rebuild before the next frame, e.g. after a window resize.
    pub fn request_recreate(&mut self) {
        self.needs_recreate = true;
    }

    /// Rebuilds the swapchain for the surface's current state.
    ///
    /// Waits on every slot's fence and idles the device first. The old
    /// swapchain is passed as a hint and destroyed once the new one exists.
    /// Frame slots and the command pool are reused; their semaphores are
    /// renewed.
    pub fn recreate_swapchain(&mut self) -> RenderResult<RecreateOutcome> {
        if self.torn_down {
            return Err(RenderError::contract("swapchain recreation after shutdown"));
        }

        let (width, height) = self.manager.framebuffer_size();
        if width == 0 || height == 0 {
            debug!("Framebuffer is {}x{}, deferring swapchain recreation", width, height);
            self.needs_recreate = true;
            return Ok(RecreateOutcome::Deferred);
        }

        if !self.drain()? {
            warn!("Frames still in flight after fence timeout, deferring swapchain recreation");
            self.needs_recreate = true;
            return Ok(RecreateOutcome::GpuBusy);
        }

        self.framebuffers.clear();
        let previous = self.swapchain.take();
        let created = self.manager.create(previous.as_ref());
        if let Some(previous) = previous {
            self.manager.retire(previous);
        }
        let swapchain = created.map_err(RenderError::frame(FrameStage::Recreate))?;

        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| RenderError::contract("no pipeline for the new swapchain"))?;
        ensure_format(pipeline, &swapchain)?;
        self.framebuffers = build_framebuffers(&self.context, pipeline.render_pass(), &swapchain)
            .map_err(RenderError::frame(FrameStage::Recreate))?;

        for slot in &mut self.slots {
            slot.renew_semaphores()?;
        }

        info!(
            "Swapchain recreated: generation {}, {} images, {}x{}",
            swapchain.generation(),
            swapchain.image_count(),
            swapchain.extent().width,
            swapchain.extent().height
        );

        self.swapchain = Some(swapchain);
        self.needs_recreate = false;
        self.recreations += 1;
        Ok(RecreateOutcome::Rebuilt)
    }

    /// Idles the device and releases every GPU object. Idempotent.
    ///
    /// Resources are released even if the idle wait fails; the error is
    /// returned afterwards.
    pub fn shutdown(&mut self) -> RenderResult<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;

        let idle = self.context.wait_idle();

        self.slots.clear();
        self.command_pool = None;
        self.framebuffers.clear();
        self.pipeline = None;
        if let Some(swapchain) = self.swapchain.take() {
            self.manager.retire(swapchain);
        }

        info!(
            "Frame loop shut down after {} frames and {} swapchain recreations",
            self.frames_presented, self.recreations
        );

        idle.map_err(RenderError::frame(FrameStage::Shutdown))
    }

    /// Waits for every slot's submission, then for the whole device.
    ///
    /// Returns `false` without idling if the fences did not signal within the
    /// fence timeout.
    fn drain(&self) -> RenderResult<bool> {
        if let Some(busy) = self.slots.iter().find(|s| s.state() != SlotState::Idle) {
            return Err(RenderError::contract(format!(
                "recreation while slot {} is {:?}",
                busy.index(),
                busy.state()
            )));
        }

        let fences: Vec<vk::Fence> = self.slots.iter().map(|s| s.fence().handle()).collect();
        if !fences.is_empty() {
            match self
                .context
                .wait_for_fences(&fences, self.settings.fence_timeout_ns)
            {
                Ok(()) => {}
                Err(vk::Result::TIMEOUT) => return Ok(false),
                Err(e) => return Err(RenderError::frame(FrameStage::Recreate)(e.into())),
            }
        }
        self.context
            .wait_idle()
            .map_err(RenderError::frame(FrameStage::Recreate))?;
        Ok(true)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn swapchain(&self) -> Option<&SwapchainState<C>> {
        self.swapchain.as_ref()
    }

    pub fn pipeline(&self) -> Option<&P> {
        self.pipeline.as_ref()
    }

    pub fn slot(&self, index: usize) -> Option<&FrameSlot<C>> {
        self.slots.get(index)
    }

    #[inline]
    pub fn settings(&self) -> &FrameSettings {
        &self.settings
    }

    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.settings.frames_in_flight
    }

    /// Slot the next frame will use.
    #[inline]
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    #[inline]
    pub fn needs_recreate(&self) -> bool {
        self.needs_recreate
    }

    #[inline]
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    #[inline]
    pub fn recreations(&self) -> u64 {
        self.recreations
    }

    #[inline]
    pub fn is_shut_down(&self) -> bool {
        self.torn_down
    }
}

impl<C, S, P> Drop for FrameOrchestrator<C, S, P>
where
    C: ExecutionContext,
    S: PresentSurface,
    P: GraphicsPipeline,
{
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("Frame loop shutdown failed: {}", e);
        }
    }
}

fn ensure_format<C: ExecutionContext, P: GraphicsPipeline>(
    pipeline: &P,
    swapchain: &SwapchainState<C>,
) -> RenderResult<()> {
    if pipeline.color_format() == swapchain.format() {
        Ok(())
    } else {
        Err(RenderError::FormatMismatch {
            pipeline: pipeline.color_format(),
            swapchain: swapchain.format(),
        })
    }
}

fn build_framebuffers<C: ExecutionContext>(
    context: &Arc<C>,
    render_pass: vk::RenderPass,
    swapchain: &SwapchainState<C>,
) -> RhiResult<Vec<Framebuffer<C>>> {
    swapchain
        .views()
        .iter()
        .map(|view| Framebuffer::new(Arc::clone(context), render_pass, view, swapchain.extent()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockContext, MockSurface};

    #[test]
    fn test_settings_from_renderer_config() {
        let config = RendererConfig {
            frames_in_flight: 3,
            fence_timeout_ns: 5_000,
            ..RendererConfig::default()
        };
        let settings = FrameSettings::from(&config);
        assert_eq!(settings.frames_in_flight, 3);
        assert_eq!(settings.fence_timeout_ns, 5_000);
        assert_eq!(settings.acquire_timeout_ns, u64::MAX);
        assert_eq!(FrameSettings::default().frames_in_flight, 1);
    }

    #[test]
    fn test_stale_image_generation_is_rejected() {
        let ctx = MockContext::new();
        let surface = MockSurface::new(&[vk::PresentModeKHR::FIFO]);
        let mut manager = SwapchainManager::new(Arc::clone(&ctx), surface);
        let first = manager.create(None).unwrap();
        let second = manager.create(Some(&first)).unwrap();

        let image = AcquiredImage {
            index: 0,
            generation: first.generation(),
        };
        assert!(image.ensure_current(&first).is_ok());
        assert!(matches!(
            image.ensure_current(&second),
            Err(RenderError::ContractViolation(_))
        ));

        let out_of_range = AcquiredImage {
            index: 7,
            generation: second.generation(),
        };
        assert!(out_of_range.ensure_current(&second).is_err());
    }
}

//! Frame slots: the per-frame-in-flight synchronization set.
//!
//! Each slot owns one command buffer and the three objects that order its
//! frame:
//!
//! ```text
//! acquire ──signals──▶ image_acquired ──waited by──▶ submit
//! submit  ──signals──▶ render_complete ──waited by──▶ present
//! submit  ──signals──▶ in_flight (fence) ──waited by──▶ host, next use of this slot
//! ```
//!
//! A slot moves through [`SlotState`] in a fixed cycle. Every transition is
//! checked and an out-of-order call is reported as
//! [`RenderError::ContractViolation`] instead of touching the GPU.

use std::sync::Arc;

use tracing::trace;

use swapframe_rhi::RhiResult;
use swapframe_rhi::command::CommandBuffer;
use swapframe_rhi::context::ExecutionContext;
use swapframe_rhi::sync::{Fence, Semaphore};

use crate::error::{FrameStage, RenderError, RenderResult};

/// Where a slot is within its frame cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Ready for a new frame. The fence may still be pending.
    Idle,
    /// Fence observed signaled; an image is being acquired.
    Acquiring,
    /// Fence reset and command buffer being recorded.
    Recording,
    /// Work submitted; the fence will signal on completion.
    Submitted,
    /// Present queued on `render_complete`.
    Presenting,
}

pub struct FrameSlot<C: ExecutionContext> {
    index: usize,
    command_buffer: CommandBuffer<C>,
    image_acquired: Semaphore<C>,
    render_complete: Semaphore<C>,
    in_flight: Fence<C>,
    state: SlotState,
    /// Set when the fence was seen signaled and not reset since.
    fence_observed: bool,
    context: Arc<C>,
}

impl<C: ExecutionContext> FrameSlot<C> {
    /// Creates a slot with two fresh semaphores and a signaled fence, so the
    /// first wait returns immediately.
    pub fn new(context: Arc<C>, index: usize, command_buffer: CommandBuffer<C>) -> RhiResult<Self> {
        Ok(Self {
            index,
            command_buffer,
            image_acquired: Semaphore::new(Arc::clone(&context))?,
            render_complete: Semaphore::new(Arc::clone(&context))?,
            in_flight: Fence::new(Arc::clone(&context), true)?,
            state: SlotState::Idle,
            fence_observed: false,
            context,
        })
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn state(&self) -> SlotState {
        self.state
    }

    #[inline]
    pub fn image_acquired(&self) -> &Semaphore<C> {
        &self.image_acquired
    }

    #[inline]
    pub fn render_complete(&self) -> &Semaphore<C> {
        &self.render_complete
    }

    #[inline]
    pub fn fence(&self) -> &Fence<C> {
        &self.in_flight
    }

    #[inline]
    pub fn command_buffer(&self) -> &CommandBuffer<C> {
        &self.command_buffer
    }

    /// Blocks until the slot's previous submission has completed.
    ///
    /// Returns `false` if `timeout_ns` elapsed first; the slot then stays
    /// [`SlotState::Idle`] and can be waited on again.
    pub fn wait_until_free(&mut self, timeout_ns: u64) -> RenderResult<bool> {
        self.expect_state(SlotState::Idle, "wait on slot")?;

        let signaled = self
            .in_flight
            .wait(timeout_ns)
            .map_err(RenderError::frame(FrameStage::WaitFence))?;
        if !signaled {
            trace!("Slot {} fence wait timed out", self.index);
            return Ok(false);
        }

        self.fence_observed = true;
        self.state = SlotState::Acquiring;
        Ok(true)
    }

    /// Returns to idle after an acquisition that produced no image.
    ///
    /// The fence was not reset, so the next wait passes immediately.
    pub fn abort_acquire(&mut self) -> RenderResult<()> {
        self.transition(SlotState::Acquiring, SlotState::Idle)
    }

    /// Resets the fence and hands out the command buffer for recording.
    ///
    /// Only legal once an image was acquired for this slot, after its fence
    /// was observed signaled.
    pub fn begin_recording(&mut self) -> RenderResult<&CommandBuffer<C>> {
        self.expect_state(SlotState::Acquiring, "begin recording")?;
        if !self.fence_observed {
            return Err(RenderError::contract(format!(
                "slot {} recorded before its fence was observed signaled",
                self.index
            )));
        }

        self.in_flight
            .reset()
            .map_err(RenderError::frame(FrameStage::Record))?;
        self.fence_observed = false;
        self.state = SlotState::Recording;
        Ok(&self.command_buffer)
    }

    pub fn mark_submitted(&mut self) -> RenderResult<()> {
        self.transition(SlotState::Recording, SlotState::Submitted)
    }

    pub fn mark_presenting(&mut self) -> RenderResult<()> {
        self.transition(SlotState::Submitted, SlotState::Presenting)
    }

    pub fn complete(&mut self) -> RenderResult<()> {
        self.transition(SlotState::Presenting, SlotState::Idle)
    }

    /// Replaces both semaphores with fresh ones.
    ///
    /// Used after swapchain recreation, where a failed present may have left
    /// `render_complete` signaled with no one left to wait on it. The GPU
    /// must be idle.
    pub fn renew_semaphores(&mut self) -> RenderResult<()> {
        self.expect_state(SlotState::Idle, "renew semaphores")?;
        self.image_acquired = Semaphore::new(Arc::clone(&self.context))
            .map_err(RenderError::frame(FrameStage::Recreate))?;
        self.render_complete = Semaphore::new(Arc::clone(&self.context))
            .map_err(RenderError::frame(FrameStage::Recreate))?;
        trace!("Slot {} semaphores renewed", self.index);
        Ok(())
    }

    fn transition(&mut self, from: SlotState, to: SlotState) -> RenderResult<()> {
        self.expect_state(from, "transition")?;
        self.state = to;
        Ok(())
    }

    fn expect_state(&self, expected: SlotState, action: &str) -> RenderResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RenderError::contract(format!(
                "{action} on slot {} requires {expected:?}, slot is {:?}",
                self.index, self.state
            )))
        }
    }
}

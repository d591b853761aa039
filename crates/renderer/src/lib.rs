//! Swapchain lifecycle and frames-in-flight orchestration.
//!
//! - [`swapchain`]: creation, recreation and retirement of swapchains
//! - [`frame`]: per-slot semaphores, fence and command buffer
//! - [`orchestrator`]: the per-frame acquire, record, submit, present protocol
//! - [`renderer`]: Vulkan bring-up for a window around the frame loop
//!
//! Everything below [`renderer`] is generic over
//! [`ExecutionContext`](swapframe_rhi::context::ExecutionContext), so the
//! protocol runs unchanged against an in-memory context in tests.

pub mod error;
pub mod frame;
pub mod orchestrator;
pub mod pipeline;
pub mod recorder;
pub mod renderer;
pub mod swapchain;

#[cfg(test)]
mod mock;

pub use error::{FrameStage, RenderError, RenderResult};
pub use frame::{FrameSlot, SlotState};
pub use orchestrator::{
    AcquiredImage, FrameOrchestrator, FrameOutcome, FrameSettings, RecreateOutcome, SkipReason,
};
pub use pipeline::TrianglePipeline;
pub use recorder::{CommandRecorder, GraphicsPipeline, RenderTarget};
pub use renderer::Renderer;
pub use swapchain::{SwapchainManager, SwapchainState};

//! Renderer error types.

use std::fmt;

use ash::vk;
use swapframe_rhi::RhiError;
use thiserror::Error;

/// The step of a frame cycle an error came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStage {
    WaitFence,
    Acquire,
    Record,
    Submit,
    Present,
    Recreate,
    Shutdown,
}

impl fmt::Display for FrameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameStage::WaitFence => "fence wait",
            FrameStage::Acquire => "image acquisition",
            FrameStage::Record => "command recording",
            FrameStage::Submit => "queue submission",
            FrameStage::Present => "presentation",
            FrameStage::Recreate => "swapchain recreation",
            FrameStage::Shutdown => "shutdown",
        })
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create {what}: {source}")]
    Startup {
        what: &'static str,
        #[source]
        source: RhiError,
    },

    #[error("Frame failed during {stage}: {source}")]
    Frame {
        stage: FrameStage,
        #[source]
        source: RhiError,
    },

    #[error("Pipeline targets {pipeline:?} but the swapchain uses {swapchain:?}")]
    FormatMismatch {
        pipeline: vk::Format,
        swapchain: vk::Format,
    },

    #[error("Frame protocol violated: {0}")]
    ContractViolation(String),
}

impl RenderError {
    /// Adapter for `map_err` on startup steps.
    pub fn startup(what: &'static str) -> impl FnOnce(RhiError) -> Self {
        move |source| Self::Startup { what, source }
    }

    /// Adapter for `map_err` inside the frame cycle.
    pub fn frame(stage: FrameStage) -> impl FnOnce(RhiError) -> Self {
        move |source| Self::Frame { stage, source }
    }

    pub(crate) fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation(message.into())
    }

    /// The frame cycle stage this error came from, if any.
    pub fn stage(&self) -> Option<FrameStage> {
        match self {
            Self::Frame { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;

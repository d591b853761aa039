//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! A thin, safe layer over `ash`:
//! - Instance, physical device and logical device creation
//! - Swapchain parameter negotiation
//! - RAII wrappers for sync objects, command buffers, image views and framebuffers
//! - Render pass, shader and pipeline creation
//!
//! The frame loop talks to the GPU only through [`context::ExecutionContext`]
//! and [`context::PresentSurface`], so it can run against a fake device in tests.

mod error;

pub mod command;
pub mod context;
pub mod device;
pub mod image;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;

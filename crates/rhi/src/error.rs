//! RHI-specific error types.

use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// Failed to load Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// Shader loading error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Surface creation or query error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain, image view or framebuffer creation failed. Never retried.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Pipeline or render pass creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

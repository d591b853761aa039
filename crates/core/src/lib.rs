//! Core utilities shared by the swapframe crates.
//!
//! - Error types and result aliases
//! - Logging initialization
//! - Configuration loading
//! - Frame timing

mod config;
mod error;
mod logging;
mod timer;

pub use config::{
    Config, LoggingConfig, MAX_FRAMES_IN_FLIGHT, RendererConfig, WindowConfig,
};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::FrameTimer;

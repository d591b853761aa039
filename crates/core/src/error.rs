//! Error types for the application and its configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the non-GPU parts of the application.
#[derive(Error, Debug)]
pub enum Error {
    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// The configuration file exists but could not be read
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::Config`]
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration value is out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the core Error type.
pub type Result<T> = std::result::Result<T, Error>;

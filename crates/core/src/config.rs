//! Application configuration.
//!
//! Configuration is read from a TOML file. Every field has a default, so a
//! missing file or a partial file is fine. A handful of settings can also be
//! overridden from the environment:
//!
//! | variable | field |
//! |---|---|
//! | `SWAPFRAME_FRAMES_IN_FLIGHT` | `renderer.frames_in_flight` |
//! | `SWAPFRAME_VALIDATION` | `renderer.validation` |
//! | `SWAPFRAME_RESIZABLE` | `window.resizable` |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Upper bound for `renderer.frames_in_flight`.
pub const MAX_FRAMES_IN_FLIGHT: usize = 4;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub renderer: RendererConfig,
    pub logging: LoggingConfig,
    /// File the configuration was read from, `None` for built-in defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Window creation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Vulkan".to_string(),
            resizable: false,
        }
    }
}

/// Frame loop and GPU parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Number of frame slots cycled round-robin (1..=[`MAX_FRAMES_IN_FLIGHT`]).
    pub frames_in_flight: usize,
    /// Timeout for the per-slot fence wait, in nanoseconds.
    pub fence_timeout_ns: u64,
    /// Timeout for swapchain image acquisition, in nanoseconds.
    pub acquire_timeout_ns: u64,
    /// RGBA clear color of the render pass.
    pub clear_color: [f32; 4],
    /// Enable the Khronos validation layer.
    pub validation: bool,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 1,
            fence_timeout_ns: u64::MAX,
            acquire_timeout_ns: u64::MAX,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            validation: cfg!(debug_assertions),
            vertex_shader: PathBuf::from("shaders/spirv/triangle.vert.spv"),
            fragment_shader: PathBuf::from("shaders/spirv/triangle.frag.spv"),
        }
    }
}

/// Logging parameters.
///
/// `filter` uses the `tracing_subscriber::EnvFilter` syntax
/// (e.g. `"info,swapframe_renderer=trace"`). `RUST_LOG` takes precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: Option<String>,
}

impl Config {
    /// Load the configuration from `path`, falling back to defaults when the
    /// file does not exist, then apply environment overrides and validate.
    ///
    /// Runs before logging is initialized, so nothing is logged here; see
    /// [`source`](Self::source).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
            let mut config = Self::from_toml(&text)?;
            config.source = Some(path.to_path_buf());
            config
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from TOML text. Missing fields take defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `SWAPFRAME_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SWAPFRAME_FRAMES_IN_FLIGHT") {
            self.renderer.frames_in_flight = value.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!(
                    "SWAPFRAME_FRAMES_IN_FLIGHT must be an integer, got {value:?}"
                ))
            })?;
        }
        if let Some(value) = lookup("SWAPFRAME_VALIDATION") {
            self.renderer.validation = parse_bool("SWAPFRAME_VALIDATION", &value)?;
        }
        if let Some(value) = lookup("SWAPFRAME_RESIZABLE") {
            self.window.resizable = parse_bool("SWAPFRAME_RESIZABLE", &value)?;
        }
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let frames = self.renderer.frames_in_flight;
        if !(1..=MAX_FRAMES_IN_FLIGHT).contains(&frames) {
            return Err(Error::InvalidConfig(format!(
                "renderer.frames_in_flight must be in 1..={MAX_FRAMES_IN_FLIGHT}, got {frames}"
            )));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.renderer.clear_color.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidConfig(
                "renderer.clear_color must contain finite values".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidConfig(format!(
            "{key} must be a boolean, got {value:?}"
        ))),
    }
}

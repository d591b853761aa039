//! SPIR-V loading and shader module creation.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::path::Path;
//! use swapframe_rhi::device::Device;
//! use swapframe_rhi::shader::{Shader, ShaderStage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), swapframe_rhi::RhiError> {
//! let vertex = Shader::from_spirv_file(
//!     device.clone(),
//!     Path::new("shaders/spirv/triangle.vert.spv"),
//!     ShaderStage::Vertex,
//!     "main",
//! )?;
//! let _stage_info = vertex.stage_create_info();
//! # Ok(())
//! # }
//! ```

use std::ffi::{CStr, CString};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// First word of every SPIR-V module.
const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Programmable stages used by the triangle pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Shader module wrapper. Only needed until the pipeline is created.
pub struct Shader {
    device: Arc<Device>,
    module: vk::ShaderModule,
    stage: ShaderStage,
    entry_point: CString,
}

impl Shader {
    /// Creates a shader module from a SPIR-V file.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::ShaderError`] if the file cannot be read or is not
    /// SPIR-V, or a Vulkan error if module creation fails.
    pub fn from_spirv_file(
        device: Arc<Device>,
        path: &Path,
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        debug!("Loading {} shader from {}", stage, path.display());

        let bytes = std::fs::read(path).map_err(|e| {
            RhiError::ShaderError(format!("Failed to read shader file {}: {}", path.display(), e))
        })?;

        Self::from_spirv_bytes(device, &bytes, stage, entry_point)
    }

    /// Creates a shader module from SPIR-V bytes.
    pub fn from_spirv_bytes(
        device: Arc<Device>,
        bytes: &[u8],
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        let code = spirv_words(bytes)?;

        let entry_point = CString::new(entry_point)
            .map_err(|e| RhiError::ShaderError(format!("Invalid entry point name: {e}")))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        debug!(
            "Created {} shader module ({} words, entry '{}')",
            stage,
            code.len(),
            entry_point.to_string_lossy()
        );

        Ok(Self {
            device,
            module,
            stage,
            entry_point,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    pub fn entry_point(&self) -> &CStr {
        &self.entry_point
    }

    /// Stage description for pipeline creation. Borrows from `self`.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {} shader module", self.stage);
    }
}

/// Decodes a SPIR-V binary into words, checking alignment and the magic number.
pub fn spirv_words(bytes: &[u8]) -> RhiResult<Vec<u32>> {
    let words = ash::util::read_spv(&mut Cursor::new(bytes))
        .map_err(|e| RhiError::ShaderError(format!("Invalid SPIR-V ({} bytes): {e}", bytes.len())))?;

    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        Some(&other) => Err(RhiError::ShaderError(format!(
            "Invalid SPIR-V magic number {other:#010x}"
        ))),
        None => Err(RhiError::ShaderError("Empty SPIR-V module".to_string())),
    }
}

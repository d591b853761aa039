//! Graphics pipeline management.
//!
//! - [`PipelineLayout`] wraps `VkPipelineLayout`
//! - [`Pipeline`] wraps a graphics `VkPipeline`
//! - [`GraphicsPipelineBuilder`] assembles fixed-function state for a
//!   render-pass-compatible pipeline with dynamic viewport and scissor
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::path::Path;
//! use swapframe_rhi::device::Device;
//! use swapframe_rhi::pipeline::{GraphicsPipelineBuilder, PipelineLayout};
//! use swapframe_rhi::render_pass::RenderPass;
//! use swapframe_rhi::shader::{Shader, ShaderStage};
//! use ash::vk;
//!
//! # fn example(device: Arc<Device>) -> Result<(), swapframe_rhi::RhiError> {
//! let vertex = Shader::from_spirv_file(
//!     device.clone(),
//!     Path::new("shaders/spirv/triangle.vert.spv"),
//!     ShaderStage::Vertex,
//!     "main",
//! )?;
//! let fragment = Shader::from_spirv_file(
//!     device.clone(),
//!     Path::new("shaders/spirv/triangle.frag.spv"),
//!     ShaderStage::Fragment,
//!     "main",
//! )?;
//! let render_pass = RenderPass::new(device.clone(), vk::Format::B8G8R8A8_SRGB)?;
//! let layout = PipelineLayout::new(device.clone())?;
//!
//! let pipeline = GraphicsPipelineBuilder::new()
//!     .vertex_shader(&vertex)
//!     .fragment_shader(&fragment)
//!     .build(device.clone(), &layout, &render_pass)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::render_pass::RenderPass;
use crate::shader::Shader;

/// Pipeline layout with no descriptor sets or push constants.
pub struct PipelineLayout {
    device: Arc<Device>,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::PipelineLayoutCreateInfo::default();
        let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };

        debug!("Created empty pipeline layout");

        Ok(Self { device, layout })
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_pipeline_layout(self.layout, None);
        }
        debug!("Pipeline layout destroyed");
    }
}

/// Graphics pipeline wrapper.
pub struct Pipeline {
    device: Arc<Device>,
    pipeline: vk::Pipeline,
}

impl Pipeline {
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
        }
        info!("Graphics pipeline destroyed");
    }
}

/// Primitive topology for input assembly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
}

impl PrimitiveTopology {
    pub fn to_vk(self) -> vk::PrimitiveTopology {
        match self {
            PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
            PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
            PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        }
    }
}

/// Face culling mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

impl CullMode {
    pub fn to_vk(self) -> vk::CullModeFlags {
        match self {
            CullMode::None => vk::CullModeFlags::NONE,
            CullMode::Front => vk::CullModeFlags::FRONT,
            CullMode::Back => vk::CullModeFlags::BACK,
        }
    }
}

/// Winding order considered front-facing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrontFace {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl FrontFace {
    pub fn to_vk(self) -> vk::FrontFace {
        match self {
            FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
            FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        }
    }
}

/// Builder for render-pass graphics pipelines without vertex input.
///
/// Vertices are generated in the vertex shader. Viewport and scissor are
/// always dynamic so the pipeline survives swapchain recreation.
#[derive(Default)]
pub struct GraphicsPipelineBuilder<'a> {
    vertex_shader: Option<&'a Shader>,
    fragment_shader: Option<&'a Shader>,
    topology: PrimitiveTopology,
    cull_mode: CullMode,
    front_face: FrontFace,
}

impl<'a> GraphicsPipelineBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_shader(mut self, shader: &'a Shader) -> Self {
        self.vertex_shader = Some(shader);
        self
    }

    pub fn fragment_shader(mut self, shader: &'a Shader) -> Self {
        self.fragment_shader = Some(shader);
        self
    }

    pub fn topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn front_face(mut self, front_face: FrontFace) -> Self {
        self.front_face = front_face;
        self
    }

    /// Dynamic states every pipeline from this builder declares.
    pub fn dynamic_states() -> [vk::DynamicState; 2] {
        [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR]
    }

    /// Creates the pipeline for subpass 0 of `render_pass`.
    ///
    /// # Errors
    ///
    /// [`RhiError::PipelineError`] if a shader stage is missing, or a Vulkan
    /// error if creation fails.
    pub fn build(
        self,
        device: Arc<Device>,
        layout: &PipelineLayout,
        render_pass: &RenderPass,
    ) -> RhiResult<Pipeline> {
        let vertex_shader = self
            .vertex_shader
            .ok_or_else(|| RhiError::PipelineError("Vertex shader is required".to_string()))?;
        let fragment_shader = self
            .fragment_shader
            .ok_or_else(|| RhiError::PipelineError("Fragment shader is required".to_string()))?;

        let shader_stages = [
            vertex_shader.stage_create_info(),
            fragment_shader.stage_create_info(),
        ];

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(self.topology.to_vk())
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(self.cull_mode.to_vk())
            .front_face(self.front_face.to_vk());

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA);

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .attachments(std::slice::from_ref(&color_blend_attachment));

        let dynamic_states = Self::dynamic_states();
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout.handle())
            .render_pass(render_pass.handle())
            .subpass(0);

        let pipelines = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, result)| result)?
        };
        let pipeline = pipelines.into_iter().next().ok_or_else(|| {
            RhiError::PipelineError("Driver returned no pipeline".to_string())
        })?;

        info!(
            "Graphics pipeline created ({:?}, color format {:?})",
            self.topology,
            render_pass.color_format()
        );

        Ok(Pipeline { device, pipeline })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = GraphicsPipelineBuilder::new();
        assert!(builder.vertex_shader.is_none());
        assert!(builder.fragment_shader.is_none());
        assert_eq!(builder.topology, PrimitiveTopology::TriangleList);
        assert_eq!(builder.cull_mode, CullMode::None);
        assert_eq!(builder.front_face, FrontFace::Clockwise);
    }

    #[test]
    fn test_builder_setters() {
        let builder = GraphicsPipelineBuilder::new()
            .topology(PrimitiveTopology::TriangleStrip)
            .cull_mode(CullMode::Back)
            .front_face(FrontFace::CounterClockwise);
        assert_eq!(builder.topology.to_vk(), vk::PrimitiveTopology::TRIANGLE_STRIP);
        assert_eq!(builder.cull_mode.to_vk(), vk::CullModeFlags::BACK);
        assert_eq!(builder.front_face.to_vk(), vk::FrontFace::COUNTER_CLOCKWISE);
    }

    #[test]
    fn test_viewport_and_scissor_are_dynamic() {
        let states = GraphicsPipelineBuilder::dynamic_states();
        assert!(states.contains(&vk::DynamicState::VIEWPORT));
        assert!(states.contains(&vk::DynamicState::SCISSOR));
    }
}

//! The triangle pipeline drawn every frame.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use swapframe_core::RendererConfig;
use swapframe_rhi::RhiResult;
use swapframe_rhi::device::Device;
use swapframe_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use swapframe_rhi::render_pass::RenderPass;
use swapframe_rhi::shader::{Shader, ShaderStage};

use crate::recorder::GraphicsPipeline;

/// Render pass, layout and pipeline for one swapchain color format.
///
/// Viewport and scissor are dynamic, so a swapchain recreation that keeps the
/// format keeps this pipeline.
pub struct TrianglePipeline {
    // Field order is drop order: pipeline, layout, then render pass.
    pipeline: Pipeline,
    layout: PipelineLayout,
    render_pass: RenderPass,
}

impl TrianglePipeline {
    /// Loads the SPIR-V shaders named in `config` and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if a shader cannot be loaded or any object fails to
    /// create.
    pub fn new(device: Arc<Device>, color_format: vk::Format, config: &RendererConfig) -> RhiResult<Self> {
        let vertex = Shader::from_spirv_file(
            Arc::clone(&device),
            &config.vertex_shader,
            ShaderStage::Vertex,
            "main",
        )?;
        let fragment = Shader::from_spirv_file(
            Arc::clone(&device),
            &config.fragment_shader,
            ShaderStage::Fragment,
            "main",
        )?;

        let render_pass = RenderPass::new(Arc::clone(&device), color_format)?;
        let layout = PipelineLayout::new(Arc::clone(&device))?;
        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex)
            .fragment_shader(&fragment)
            .build(device, &layout, &render_pass)?;

        info!("Triangle pipeline ready for {:?}", color_format);

        Ok(Self {
            pipeline,
            layout,
            render_pass,
        })
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout.handle()
    }
}

impl GraphicsPipeline for TrianglePipeline {
    fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.handle()
    }

    fn pipeline(&self) -> vk::Pipeline {
        self.pipeline.handle()
    }

    fn color_format(&self) -> vk::Format {
        self.render_pass.color_format()
    }
}

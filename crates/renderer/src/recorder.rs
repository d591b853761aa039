//! Per-frame command recording.

use ash::vk;

use swapframe_rhi::RhiResult;
use swapframe_rhi::command::CommandBuffer;
use swapframe_rhi::context::{ExecutionContext, RenderPassBegin};

/// Vertices drawn per frame. The vertex shader generates them from the index.
pub const TRIANGLE_VERTEX_COUNT: u32 = 3;

/// A pipeline that can draw into swapchain framebuffers.
pub trait GraphicsPipeline {
    /// Render pass the pipeline and the framebuffers are built for.
    fn render_pass(&self) -> vk::RenderPass;
    fn pipeline(&self) -> vk::Pipeline;
    /// Color attachment format; must equal the swapchain format.
    fn color_format(&self) -> vk::Format;
}

/// The framebuffer of the acquired image and its size.
#[derive(Clone, Copy, Debug)]
pub struct RenderTarget {
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
}

/// Records the frame's single draw.
pub struct CommandRecorder {
    clear_color: [f32; 4],
}

impl CommandRecorder {
    pub fn new(clear_color: [f32; 4]) -> Self {
        Self { clear_color }
    }

    #[inline]
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Re-records `cmd` from scratch: clear, bind, set viewport and scissor to
    /// the target extent, draw one triangle.
    ///
    /// The caller guarantees the buffer's previous submission has completed.
    pub fn record<C, P>(
        &self,
        cmd: &CommandBuffer<C>,
        target: &RenderTarget,
        pipeline: &P,
    ) -> RhiResult<()>
    where
        C: ExecutionContext,
        P: GraphicsPipeline + ?Sized,
    {
        cmd.reset()?;
        cmd.begin()?;

        cmd.begin_render_pass(&RenderPassBegin {
            render_pass: pipeline.render_pass(),
            framebuffer: target.framebuffer,
            render_area: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: target.extent,
            },
            clear_color: self.clear_color,
        });
        cmd.bind_graphics_pipeline(pipeline.pipeline());
        cmd.set_viewport_and_scissor(target.extent);
        cmd.draw(TRIANGLE_VERTEX_COUNT, 1);
        cmd.end_render_pass();

        cmd.end()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mock::{Event, MOCK_FORMAT, MockContext, MockPipeline};
    use swapframe_rhi::command::CommandPool;

    #[test]
    fn test_record_emits_single_triangle_pass() {
        let ctx = MockContext::new();
        let pool = CommandPool::new(Arc::clone(&ctx), 0).unwrap();
        let cmd = pool.allocate_command_buffers(1).unwrap().remove(0);
        let pipeline = MockPipeline::new(Arc::clone(&ctx), MOCK_FORMAT);
        let extent = vk::Extent2D {
            width: 640,
            height: 480,
        };
        let target = RenderTarget {
            framebuffer: vk::Framebuffer::null(),
            extent,
        };
        ctx.clear_events();

        let recorder = CommandRecorder::new([0.0, 0.0, 0.0, 1.0]);
        recorder.record(&cmd, &target, &pipeline).unwrap();

        let handle = cmd.handle();
        let events = ctx.events();
        assert_eq!(
            events,
            vec![
                Event::ResetCommandBuffer(handle),
                Event::BeginCommandBuffer(handle),
                Event::BeginRenderPass {
                    cmd: handle,
                    render_pass: pipeline.render_pass(),
                    framebuffer: vk::Framebuffer::null(),
                    render_area: vk::Rect2D {
                        offset: vk::Offset2D { x: 0, y: 0 },
                        extent,
                    },
                    clear_color: [0.0, 0.0, 0.0, 1.0],
                },
                Event::BindPipeline(handle, pipeline.pipeline()),
                Event::SetViewportScissor(handle, extent),
                Event::Draw {
                    cmd: handle,
                    vertex_count: 3,
                    instance_count: 1,
                },
                Event::EndRenderPass(handle),
                Event::EndCommandBuffer(handle),
            ]
        );
    }
}

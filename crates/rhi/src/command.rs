//! Command pool and command buffer management.
//!
//! - [`CommandPool`] owns a `VkCommandPool` and allocates buffers from it
//! - [`CommandBuffer`] wraps a primary buffer with the recording calls the
//!   frame loop issues
//!
//! Buffers are freed together with their pool, so a [`CommandBuffer`] has no
//! destructor of its own. Keep the pool alive for as long as any buffer is
//! in use.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use swapframe_rhi::device::Device;
//! use swapframe_rhi::command::CommandPool;
//! use swapframe_rhi::context::ExecutionContext;
//!
//! # fn example(device: Arc<Device>) -> Result<(), swapframe_rhi::RhiError> {
//! let family = device.queue_families().graphics;
//! let pool = CommandPool::new(device.clone(), family)?;
//!
//! let cmd = pool.allocate_command_buffers(1)?.remove(0);
//! cmd.begin()?;
//! // ... record rendering commands ...
//! cmd.end()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::context::{ExecutionContext, RenderPassBegin};
use crate::error::RhiResult;

/// Command pool wrapper.
///
/// Created with `RESET_COMMAND_BUFFER`, so each buffer can be re-recorded
/// without resetting the whole pool. Not thread-safe: record from one thread.
pub struct CommandPool<C: ExecutionContext> {
    context: Arc<C>,
    pool: vk::CommandPool,
    queue_family_index: u32,
}

impl<C: ExecutionContext> CommandPool<C> {
    /// Creates a new command pool for the specified queue family.
    ///
    /// # Errors
    ///
    /// Returns an error if command pool creation fails.
    pub fn new(context: Arc<C>, queue_family_index: u32) -> RhiResult<Self> {
        let pool = context.create_command_pool(queue_family_index)?;

        debug!("Command pool created for queue family {}", queue_family_index);

        Ok(Self {
            context,
            pool,
            queue_family_index,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Allocates `count` primary command buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails.
    pub fn allocate_command_buffers(&self, count: u32) -> RhiResult<Vec<CommandBuffer<C>>> {
        let buffers = self.context.allocate_command_buffers(self.pool, count)?;
        Ok(buffers
            .into_iter()
            .map(|buffer| CommandBuffer {
                context: Arc::clone(&self.context),
                buffer,
            })
            .collect())
    }
}

impl<C: ExecutionContext> Drop for CommandPool<C> {
    fn drop(&mut self) {
        self.context.destroy_command_pool(self.pool);
        debug!("Command pool destroyed");
    }
}

/// Primary command buffer allocated from a [`CommandPool`].
pub struct CommandBuffer<C: ExecutionContext> {
    context: Arc<C>,
    buffer: vk::CommandBuffer,
}

impl<C: ExecutionContext> CommandBuffer<C> {
    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    // ========================================================================
    // Recording Lifecycle
    // ========================================================================

    /// Discards all previously recorded commands.
    pub fn reset(&self) -> RhiResult<()> {
        self.context.reset_command_buffer(self.buffer)
    }

    /// Begins recording.
    pub fn begin(&self) -> RhiResult<()> {
        self.context.begin_command_buffer(self.buffer)
    }

    /// Ends recording.
    pub fn end(&self) -> RhiResult<()> {
        self.context.end_command_buffer(self.buffer)
    }

    // ========================================================================
    // Render Pass Commands
    // ========================================================================

    /// Begins a render pass with inline subpass contents.
    pub fn begin_render_pass(&self, begin: &RenderPassBegin) {
        self.context.cmd_begin_render_pass(self.buffer, begin);
    }

    pub fn end_render_pass(&self) {
        self.context.cmd_end_render_pass(self.buffer);
    }

    // ========================================================================
    // State and Draw Commands
    // ========================================================================

    pub fn bind_graphics_pipeline(&self, pipeline: vk::Pipeline) {
        self.context.cmd_bind_graphics_pipeline(self.buffer, pipeline);
    }

    /// Sets viewport 0 and scissor 0 to cover `extent` (depth range 0..1).
    pub fn set_viewport_and_scissor(&self, extent: vk::Extent2D) {
        self.context.cmd_set_viewport_and_scissor(self.buffer, extent);
    }

    /// Non-indexed draw starting at vertex 0, instance 0.
    pub fn draw(&self, vertex_count: u32, instance_count: u32) {
        self.context.cmd_draw(self.buffer, vertex_count, instance_count);
    }
}

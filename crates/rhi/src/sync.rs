//! Synchronization primitives.
//!
//! - [`Semaphore`] - GPU-to-GPU ordering between queue operations
//! - [`Fence`] - GPU-to-CPU completion, waited on by the host
//!
//! Both are generic over the [`ExecutionContext`] that created them and keep
//! it alive through an `Arc`, so a wrapper can never outlive its device.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use swapframe_rhi::device::Device;
//! use swapframe_rhi::sync::{Fence, Semaphore};
//!
//! # fn example(device: Arc<Device>) -> Result<(), swapframe_rhi::RhiError> {
//! let image_available = Semaphore::new(device.clone())?;
//! let in_flight = Fence::new(device.clone(), true)?;
//!
//! if in_flight.wait(u64::MAX)? {
//!     in_flight.reset()?;
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::trace;

use crate::context::ExecutionContext;
use crate::error::{RhiError, RhiResult};

/// Semaphore wrapper. Created unsignaled.
pub struct Semaphore<C: ExecutionContext> {
    context: Arc<C>,
    semaphore: vk::Semaphore,
}

impl<C: ExecutionContext> Semaphore<C> {
    /// Creates a new unsignaled semaphore.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(context: Arc<C>) -> RhiResult<Self> {
        let semaphore = context.create_semaphore()?;
        trace!("Created semaphore {:?}", semaphore);
        Ok(Self { context, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl<C: ExecutionContext> Drop for Semaphore<C> {
    fn drop(&mut self) {
        self.context.destroy_semaphore(self.semaphore);
        trace!("Destroyed semaphore {:?}", self.semaphore);
    }
}

/// Fence wrapper.
pub struct Fence<C: ExecutionContext> {
    context: Arc<C>,
    fence: vk::Fence,
}

impl<C: ExecutionContext> Fence<C> {
    /// Creates a new fence.
    ///
    /// # Arguments
    ///
    /// * `context` - The execution context
    /// * `signaled` - Create the fence already signaled, so the first wait
    ///   before any submission returns immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if fence creation fails.
    pub fn new(context: Arc<C>, signaled: bool) -> RhiResult<Self> {
        let fence = context.create_fence(signaled)?;
        trace!("Created fence {:?} (signaled: {})", fence, signaled);
        Ok(Self { context, fence })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence is signaled or `timeout` nanoseconds pass.
    ///
    /// Returns `true` when signaled and `false` on timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails (e.g. device lost).
    pub fn wait(&self, timeout: u64) -> RhiResult<bool> {
        match self.context.wait_for_fences(&[self.fence], timeout) {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(RhiError::from(e)),
        }
    }

    /// Returns the fence to the unsignaled state.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset fails.
    pub fn reset(&self) -> RhiResult<()> {
        self.context.reset_fences(&[self.fence])
    }

    /// Non-blocking status check.
    pub fn is_signaled(&self) -> RhiResult<bool> {
        self.wait(0)
    }
}

impl<C: ExecutionContext> Drop for Fence<C> {
    fn drop(&mut self) {
        self.context.destroy_fence(self.fence);
        trace!("Destroyed fence {:?}", self.fence);
    }
}

//! Device context: worker pool, hardware info, buffer allocation.
//!
//! `DeviceContext` owns the worker pool and the detected hardware info.
//! Create once, then hand [`CommandQueue`]s to the algorithms that need a
//! dispatch target.

use std::sync::Arc;

use crate::buffer::DeviceBuffer;
use crate::hardware::{HardwareInfo, TargetArch};
use crate::queue::{CommandQueue, DeviceError};

/// Shared device state: worker pool and hardware description.
pub struct DeviceContext {
    pool: Arc<rayon::ThreadPool>,
    hardware: HardwareInfo,
}

impl DeviceContext {
    /// Initialize the device: build the worker pool and detect hardware.
    ///
    /// # Panics
    /// Panics if the worker pool cannot be created.
    pub fn new() -> Self {
        let hardware = HardwareInfo::detect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(hardware.compute_units)
            .build()
            .expect("failed to create device worker pool");
        Self {
            pool: Arc::new(pool),
            hardware,
        }
    }

    /// Like [`new`](Self::new), but with a pinned architecture id.
    ///
    /// Lets tests exercise architecture-specific tuning entries without
    /// environment plumbing.
    pub fn with_arch(arch: TargetArch) -> Self {
        let mut ctx = Self::new();
        ctx.hardware.arch = arch;
        ctx
    }

    /// Detected hardware description.
    pub fn hardware(&self) -> &HardwareInfo {
        &self.hardware
    }

    /// Create a FIFO command queue bound to this device.
    pub fn command_queue(&self) -> CommandQueue {
        CommandQueue::new(Arc::clone(&self.pool), self.hardware.arch)
    }

    /// Allocate a device buffer of `len` elements.
    pub fn alloc_buffer<T: Copy + Send + Sync + 'static>(
        &self,
        len: usize,
    ) -> Result<DeviceBuffer<T>, DeviceError> {
        DeviceBuffer::new(len)
    }

    /// Allocate a device buffer initialized from a host slice.
    pub fn alloc_buffer_with_data<T: Copy + Send + Sync + 'static>(
        &self,
        data: &[T],
    ) -> Result<DeviceBuffer<T>, DeviceError> {
        let mut buf = DeviceBuffer::new(data.len())?;
        buf.copy_from_slice(data);
        Ok(buf)
    }
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self::new()
    }
}

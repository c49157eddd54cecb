//! FIFO command queue: barrier-ordered kernel dispatch onto the worker pool.
//!
//! One `dispatch` call is one parallel task submission: `group_count`
//! independent execution groups run the kernel closure, and the call returns
//! only after every group has finished. Consecutive dispatches on a queue are
//! therefore implicitly barrier-ordered, which is the synchronization model
//! the merge network relies on between passes.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::hardware::TargetArch;

/// Device-level failures surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device allocation of {bytes} bytes failed")]
    OutOfMemory { bytes: usize },
    #[error("kernel '{label}' faulted: {message}")]
    KernelFault { label: String, message: String },
}

/// FIFO-ordered dispatch target bound to a device context's worker pool.
///
/// Cheap to clone; clones submit to the same pool and serialize with each
/// other in submission order.
#[derive(Clone)]
pub struct CommandQueue {
    pool: Arc<rayon::ThreadPool>,
    submit: Arc<Mutex<()>>,
    arch: TargetArch,
}

impl CommandQueue {
    pub(crate) fn new(pool: Arc<rayon::ThreadPool>, arch: TargetArch) -> Self {
        Self {
            pool,
            submit: Arc::new(Mutex::new(())),
            arch,
        }
    }

    /// Architecture of the device this queue dispatches to.
    pub fn arch(&self) -> TargetArch {
        self.arch
    }

    /// Submit one kernel dispatch of `group_count` execution groups.
    ///
    /// The kernel runs once per group with the group id. Groups must write
    /// disjoint output ranges; the queue provides no intra-dispatch
    /// synchronization. Returns after all groups complete. A panicking group
    /// is reported as [`DeviceError::KernelFault`]; completion of sibling
    /// groups in a faulted dispatch is not guaranteed.
    ///
    /// With `debug_synchronous` set, a `log::debug!` line records the label,
    /// group count, and elapsed time of the dispatch.
    pub fn dispatch<F>(
        &self,
        label: &str,
        group_count: usize,
        debug_synchronous: bool,
        kernel: F,
    ) -> Result<(), DeviceError>
    where
        F: Fn(usize) + Send + Sync,
    {
        let _guard = self.submit.lock().unwrap_or_else(|e| e.into_inner());
        let started = Instant::now();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| {
                use rayon::prelude::*;
                (0..group_count).into_par_iter().for_each(|group| kernel(group));
            });
        }));

        match outcome {
            Ok(()) => {
                if debug_synchronous {
                    log::debug!(
                        "{label}: {group_count} groups in {:.3} ms",
                        started.elapsed().as_secs_f64() * 1000.0
                    );
                }
                Ok(())
            }
            Err(payload) => Err(DeviceError::KernelFault {
                label: label.to_string(),
                message: panic_message(payload),
            }),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

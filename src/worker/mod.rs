//! `ComputeWorker` abstraction: one parallel execution target (the CPU
//! worker pool or an accelerator) that consumes a batch and returns a
//! partial reduction. The farmer depends only on this trait, never on a
//! concrete backend, so a CPU-pool backend and an accelerator-simulation
//! backend share one dispatch/combine code path.

pub mod accelerator;
pub mod cpu;
pub mod ops;

pub use ops::{bin_batch, reconstruct_signed_range, reduce_scan, ReduceScan};

use crate::error::SolverError;
use std::sync::Mutex;

/// One unit of dispatchable work: an owned chunk of the current batch plus
/// whatever parameters the operation needs. Pass 1 issues `ReduceScan`;
/// pass 2 issues `Bin` once the histogram shape is known.
#[derive(Debug, Clone)]
pub enum WorkItem {
    ReduceScan { batch: Vec<f64> },
    Bin {
        batch: Vec<f64>,
        size: f64,
        min: f64,
        k: usize,
    },
}

/// The result of executing one `WorkItem` on some worker.
#[derive(Debug, Clone)]
pub enum PartialResult {
    ReduceScan(ReduceScan),
    Bin(Vec<u64>),
}

/// A single parallel execution target. Both batch operations are
/// stateless pure functions over a batch; what differs between backends is
/// *where* and *how asynchronously* they run.
pub trait ComputeWorker: Send + Sync {
    /// Stable, human-readable identity (device name for accelerators,
    /// a fixed label for the CPU pool).
    fn name(&self) -> &str;

    /// `true` iff no task is in flight on this worker.
    fn is_idle(&self) -> bool;

    /// `true` iff a task was dispatched and has since completed but its
    /// result has not yet been collected via [`ComputeWorker::join`]. The
    /// farmer joins such workers before redispatching to them.
    fn has_result(&self) -> bool;

    /// Launches `item` on this worker. The worker becomes busy until the
    /// caller calls [`ComputeWorker::join`]. Must only be called when
    /// [`ComputeWorker::is_idle`] is `true`.
    fn dispatch(&self, item: WorkItem);

    /// Blocks until the in-flight task completes and returns its result, or
    /// a typed [`SolverError::AcceleratorUnavailable`] if the backend failed
    /// to produce one. Leaves the worker idle again either way. Panics
    /// if no task is in flight, callers only join workers they have
    /// themselves dispatched to.
    fn join(&self) -> Result<PartialResult, SolverError>;
}

/// Shared one-shot slot used by both backends to hand a completed
/// `PartialResult` back from a background thread to the farmer without a
/// condvar: `is_idle`/`is_ready` poll the slot, `join` blocks on the
/// underlying thread handle once a result is expected.
pub(crate) struct TaskSlot {
    pub(crate) handle: Mutex<Option<std::thread::JoinHandle<PartialResult>>>,
}

impl TaskSlot {
    pub(crate) fn new() -> Self {
        TaskSlot {
            handle: Mutex::new(None),
        }
    }

    /// Idle iff no task handle exists, or the handle reports ready.
    pub(crate) fn is_idle(&self) -> bool {
        match &*self.handle.lock().unwrap() {
            None => true,
            Some(h) => h.is_finished(),
        }
    }

    /// `true` iff a handle exists and has already finished.
    pub(crate) fn has_result(&self) -> bool {
        matches!(&*self.handle.lock().unwrap(), Some(h) if h.is_finished())
    }

    pub(crate) fn set(&self, handle: std::thread::JoinHandle<PartialResult>) {
        let mut guard = self.handle.lock().unwrap();
        assert!(guard.is_none(), "dispatch called on a busy worker");
        *guard = Some(handle);
    }

    pub(crate) fn join(&self) -> PartialResult {
        let handle = self
            .handle
            .lock()
            .unwrap()
            .take()
            .expect("join called on an idle worker");
        handle.join().expect("worker thread panicked")
    }
}

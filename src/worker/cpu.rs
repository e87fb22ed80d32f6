//! CPU-pool `ComputeWorker` backend: a `rayon` thread pool reused across
//! batches, splitting each batch into per-thread chunks whose local
//! accumulators are combined associatively at batch end.

use super::{bin_batch, reduce_scan, ComputeWorker, PartialResult, ReduceScan, TaskSlot, WorkItem};
use rayon::prelude::*;

/// Data-parallel CPU backend. Presents the same async dispatch/join
/// interface as the accelerator backend (a background thread runs the
/// rayon reduction and reports completion through a `TaskSlot`) so the
/// farmer's dispatch loop never branches on worker kind.
pub struct CpuPoolWorker {
    slot: TaskSlot,
    chunk_len: usize,
}

impl CpuPoolWorker {
    pub fn new() -> Self {
        let threads = num_cpus::get().max(1);
        CpuPoolWorker {
            slot: TaskSlot::new(),
            chunk_len: 4096usize.max(threads),
        }
    }
}

impl Default for CpuPoolWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeWorker for CpuPoolWorker {
    fn name(&self) -> &str {
        "cpu-pool"
    }

    fn is_idle(&self) -> bool {
        self.slot.is_idle()
    }

    fn has_result(&self) -> bool {
        self.slot.has_result()
    }

    fn dispatch(&self, item: WorkItem) {
        let chunk_len = self.chunk_len;
        let handle = std::thread::spawn(move || match item {
            WorkItem::ReduceScan { batch } => {
                let result = batch
                    .par_chunks(chunk_len)
                    .map(reduce_scan)
                    .reduce(ReduceScan::identity, |a, b| a.combine(&b));
                PartialResult::ReduceScan(result)
            }
            WorkItem::Bin { batch, size, min, k } => {
                let result = batch
                    .par_chunks(chunk_len)
                    .map(|chunk| bin_batch(chunk, size, min, k))
                    .reduce(
                        || vec![0u64; k.max(1)],
                        |mut a, b| {
                            for (x, y) in a.iter_mut().zip(b.iter()) {
                                *x += y;
                            }
                            a
                        },
                    );
                PartialResult::Bin(result)
            }
        });
        self.slot.set(handle);
    }

    fn join(&self) -> Result<PartialResult, crate::error::SolverError> {
        Ok(self.slot.join())
    }
}

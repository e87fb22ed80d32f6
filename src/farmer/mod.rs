//! The farmer: dispatches each batch across available workers under the
//! user-selected policy, rejoins per-worker partial reductions, and
//! enforces the policy when one class of worker is unavailable.

use crate::config::DispatchPolicy;
use crate::error::{Result, SolverError};
use crate::worker::{
    bin_batch, reconstruct_signed_range, reduce_scan, ComputeWorker, PartialResult, ReduceScan,
    WorkItem,
};
use tracing::{debug, warn};

/// Combined pass-1 result: the signed min/max range plus the flags carried
/// alongside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pass1Result {
    pub min: f64,
    pub max: f64,
    pub has_negative: bool,
    pub has_non_integer: bool,
    pub count: u64,
}

/// Orchestrates CPU-pool and accelerator workers under a [`DispatchPolicy`].
pub struct Farmer {
    policy: DispatchPolicy,
    accelerators: Vec<Box<dyn ComputeWorker>>,
    cpu: Box<dyn ComputeWorker>,
    /// Partial results collected from workers that were joined mid-pass
    /// (either because they were redispatched to, or at `finish`).
    pending: Vec<PartialResult>,
    /// The work item currently in flight on each accelerator, kept so a
    /// failed device's work can be recomputed locally instead of lost.
    accel_inflight_item: Vec<Option<WorkItem>>,
}

/// Runs `item` through the same stateless ops a worker backend would have,
/// used when an accelerator fails and its work must be recovered on the
/// driver thread instead of falling back to the CPU entirely.
fn compute_locally(item: WorkItem) -> PartialResult {
    match item {
        WorkItem::ReduceScan { batch } => PartialResult::ReduceScan(reduce_scan(&batch)),
        WorkItem::Bin { batch, size, min, k } => PartialResult::Bin(bin_batch(&batch, size, min, k)),
    }
}

impl Farmer {
    pub fn new(
        policy: DispatchPolicy,
        accelerators: Vec<Box<dyn ComputeWorker>>,
        cpu: Box<dyn ComputeWorker>,
    ) -> Self {
        let n = accelerators.len();
        Farmer {
            policy,
            accelerators,
            cpu,
            pending: Vec::new(),
            accel_inflight_item: vec![None; n],
        }
    }

    fn accelerators_allowed(&self) -> bool {
        matches!(
            self.policy,
            DispatchPolicy::Both | DispatchPolicy::AcceleratorOnly
        )
    }

    /// Indices of accelerators with no task in flight, or whose task has
    /// already finished (ready to be joined and redispatched to).
    fn idle_accelerator_indices(&self) -> Vec<usize> {
        self.accelerators
            .iter()
            .enumerate()
            .filter(|(_, w)| w.is_idle())
            .map(|(i, _)| i)
            .collect()
    }

    /// Splits `batch` into `n` equal-sized chunks, the last absorbing the
    /// remainder. `n` must be `>= 1`.
    fn partition(batch: &[f64], n: usize) -> Vec<Vec<f64>> {
        debug_assert!(n >= 1);
        let chunk_size = batch.len() / n;
        let mut chunks = Vec::with_capacity(n);
        let mut offset = 0;
        for i in 0..n {
            let end = if i + 1 == n { batch.len() } else { offset + chunk_size };
            chunks.push(batch[offset..end].to_vec());
            offset = end;
        }
        chunks
    }

    /// Joins the CPU pool's in-flight/finished task, collecting its partial
    /// result into `pending`.
    fn drain_cpu(&mut self) -> Result<()> {
        let partial = self.cpu.join()?;
        self.pending.push(partial);
        Ok(())
    }

    /// Joins one accelerator's in-flight/finished task. On success its
    /// partial result is collected into `pending`. On failure
    /// (`AcceleratorUnavailable`): under `AcceleratorOnly` the error is
    /// surfaced so the caller aborts the run; otherwise the lost work is
    /// recomputed locally from the item that was in flight and folded into
    /// `pending` the same as a successful worker result would have been.
    fn drain_accelerator(&mut self, idx: usize) -> Result<()> {
        match self.accelerators[idx].join() {
            Ok(partial) => {
                self.accel_inflight_item[idx] = None;
                self.pending.push(partial);
                Ok(())
            }
            Err(e) => {
                warn!(device = self.accelerators[idx].name(), error = %e, "accelerator worker failed");
                let item = self.accel_inflight_item[idx].take();
                if matches!(self.policy, DispatchPolicy::AcceleratorOnly) {
                    return Err(e);
                }
                if let Some(item) = item {
                    warn!(device = self.accelerators[idx].name(), "falling back to CPU recomputation for the lost chunk");
                    self.pending.push(compute_locally(item));
                }
                Ok(())
            }
        }
    }

    /// Dispatches one batch, constructing each chunk's `WorkItem` via
    /// `make_item`. Accelerators are preferred whenever any are idle and
    /// the policy allows it; otherwise the whole batch goes to the CPU
    /// pool (busy-waiting first under `AcceleratorOnly` if no accelerator
    /// is currently idle).
    pub fn dispatch_batch(
        &mut self,
        batch: Vec<f64>,
        make_item: impl Fn(Vec<f64>) -> WorkItem,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        loop {
            if self.accelerators_allowed() && !self.accelerators.is_empty() {
                let idle = self.idle_accelerator_indices();
                if !idle.is_empty() {
                    for &i in &idle {
                        if self.accelerators[i].has_result() {
                            self.drain_accelerator(i)?;
                        }
                    }
                    let chunks = Self::partition(&batch, idle.len());
                    for (&i, chunk) in idle.iter().zip(chunks.into_iter()) {
                        let item = make_item(chunk);
                        debug!(worker = self.accelerators[i].name(), "dispatch chunk to accelerator");
                        self.accel_inflight_item[i] = Some(item.clone());
                        self.accelerators[i].dispatch(item);
                    }
                    return Ok(());
                }
                if matches!(self.policy, DispatchPolicy::AcceleratorOnly) {
                    // Bounded spin with yield: no accelerator is idle yet.
                    std::thread::yield_now();
                    continue;
                }
                // `Both`: fall through to the CPU pool for this batch.
            }

            if !self.cpu.is_idle() {
                self.drain_cpu()?;
            }
            debug!(batch_len = batch.len(), "dispatch whole batch to cpu pool");
            self.cpu.dispatch(make_item(batch));
            return Ok(());
        }
    }

    /// Waits for every in-flight task and combines all collected pass-1
    /// partials (`ReduceScan`s) into the final signed range + flags.
    pub fn finish_pass1(&mut self, total_valid: u64) -> Result<Pass1Result> {
        self.join_all()?;
        let combined = self
            .pending
            .drain(..)
            .map(|p| match p {
                PartialResult::ReduceScan(scan) => scan,
                PartialResult::Bin(_) => {
                    unreachable!("pass 1 only dispatches ReduceScan work items")
                }
            })
            .fold(ReduceScan::identity(), |acc, scan| acc.combine(&scan));

        let (min, max, has_negative) = reconstruct_signed_range(&combined);
        Ok(Pass1Result {
            min,
            max,
            has_negative,
            has_non_integer: combined.has_non_integer,
            count: total_valid,
        })
    }

    /// Waits for every in-flight task and combines all collected pass-2
    /// partials (bin-count deltas) into the final histogram delta vector.
    pub fn finish_pass2(&mut self, k: usize) -> Result<Vec<u64>> {
        self.join_all()?;
        let mut total = vec![0u64; k.max(1)];
        for partial in self.pending.drain(..) {
            match partial {
                PartialResult::Bin(delta) => {
                    for (t, d) in total.iter_mut().zip(delta.iter()) {
                        *t += d;
                    }
                }
                PartialResult::ReduceScan(_) => {
                    unreachable!("pass 2 only dispatches Bin work items")
                }
            }
        }
        Ok(total)
    }

    /// Joins every worker that has an outstanding (in-flight or
    /// finished-but-unjoined) task. A worker with no handle at all is
    /// `is_idle() == true` and `has_result() == false`, so it's skipped.
    fn join_all(&mut self) -> Result<()> {
        for i in 0..self.accelerators.len() {
            if !self.accelerators[i].is_idle() || self.accelerators[i].has_result() {
                self.drain_accelerator(i)?;
            }
        }
        if !self.cpu.is_idle() || self.cpu.has_result() {
            self.drain_cpu()?;
        }
        Ok(())
    }

    pub fn warn_if_degraded(&self) {
        if self.accelerators.is_empty() && self.accelerators_allowed() {
            warn!("no accelerator devices available; all batches route to the CPU pool");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::accelerator::AcceleratorWorker;
    use crate::worker::cpu::CpuPoolWorker;

    fn make_farmer(policy: DispatchPolicy, n_accel: usize) -> Farmer {
        let accelerators: Vec<Box<dyn ComputeWorker>> = (0..n_accel)
            .map(|i| Box::new(AcceleratorWorker::new(format!("gpu{i}"))) as Box<dyn ComputeWorker>)
            .collect();
        Farmer::new(policy, accelerators, Box::new(CpuPoolWorker::new()))
    }

    #[test]
    fn cpu_only_never_touches_accelerators() {
        let mut farmer = make_farmer(DispatchPolicy::CpuOnly, 2);
        let batch: Vec<f64> = (0..100).map(|i| i as f64).collect();
        farmer
            .dispatch_batch(batch, |b| WorkItem::ReduceScan { batch: b })
            .unwrap();
        let result = farmer.finish_pass1(100).unwrap();
        assert_eq!(result.min, 0.0);
        assert_eq!(result.max, 99.0);
        assert_eq!(result.count, 100);
    }

    #[test]
    fn both_uses_accelerators_when_idle() {
        let mut farmer = make_farmer(DispatchPolicy::Both, 2);
        let batch: Vec<f64> = (0..100).map(|i| i as f64).collect();
        farmer
            .dispatch_batch(batch, |b| WorkItem::ReduceScan { batch: b })
            .unwrap();
        let result = farmer.finish_pass1(100).unwrap();
        assert_eq!(result.min, 0.0);
        assert_eq!(result.max, 99.0);
    }

    #[test]
    fn accelerator_only_reduction_matches_cpu_only() {
        let values: Vec<f64> = (0..500).map(|i| (i as f64) * 1.37 - 50.0).collect();

        let mut cpu_farmer = make_farmer(DispatchPolicy::CpuOnly, 0);
        cpu_farmer
            .dispatch_batch(values.clone(), |b| WorkItem::ReduceScan { batch: b })
            .unwrap();
        let cpu_result = cpu_farmer.finish_pass1(values.len() as u64).unwrap();

        let mut accel_farmer = make_farmer(DispatchPolicy::AcceleratorOnly, 3);
        accel_farmer
            .dispatch_batch(values.clone(), |b| WorkItem::ReduceScan { batch: b })
            .unwrap();
        let accel_result = accel_farmer.finish_pass1(values.len() as u64).unwrap();

        assert_eq!(cpu_result.min, accel_result.min);
        assert_eq!(cpu_result.max, accel_result.max);
        assert_eq!(cpu_result.has_negative, accel_result.has_negative);
        assert_eq!(cpu_result.has_non_integer, accel_result.has_non_integer);
    }

    #[test]
    fn pass2_bin_deltas_sum_to_batch_length() {
        let mut farmer = make_farmer(DispatchPolicy::Both, 2);
        let batch: Vec<f64> = (0..200).map(|i| i as f64 * 0.5).collect();
        let k = 10;
        farmer
            .dispatch_batch(batch.clone(), move |b| WorkItem::Bin {
                batch: b,
                size: 10.0,
                min: 0.0,
                k,
            })
            .unwrap();
        let delta = farmer.finish_pass2(k).unwrap();
        assert_eq!(delta.iter().sum::<u64>(), batch.len() as u64);
    }

    #[test]
    fn multiple_batches_reuse_workers_without_double_join_panics() {
        let mut farmer = make_farmer(DispatchPolicy::Both, 2);
        for _ in 0..5 {
            let batch: Vec<f64> = (0..50).map(|i| i as f64).collect();
            farmer
                .dispatch_batch(batch, |b| WorkItem::ReduceScan { batch: b })
                .unwrap();
        }
        let result = farmer.finish_pass1(250).unwrap();
        assert_eq!(result.count, 250);
    }

    #[test]
    fn both_policy_falls_back_to_cpu_recomputation_when_accelerator_fails() {
        let accelerators: Vec<Box<dyn ComputeWorker>> =
            vec![Box::new(AcceleratorWorker::always_failing("gpu0"))];
        let mut farmer = Farmer::new(DispatchPolicy::Both, accelerators, Box::new(CpuPoolWorker::new()));
        let batch: Vec<f64> = (0..100).map(|i| i as f64).collect();
        farmer
            .dispatch_batch(batch, |b| WorkItem::ReduceScan { batch: b })
            .unwrap();
        // The failing accelerator's chunk must still be recovered, so the
        // combined reduction is unaffected by the device failure.
        let result = farmer.finish_pass1(100).unwrap();
        assert_eq!(result.min, 0.0);
        assert_eq!(result.max, 99.0);
        assert_eq!(result.count, 100);
    }

    #[test]
    fn accelerator_only_policy_aborts_when_the_device_fails() {
        let accelerators: Vec<Box<dyn ComputeWorker>> =
            vec![Box::new(AcceleratorWorker::always_failing("gpu0"))];
        let mut farmer = Farmer::new(
            DispatchPolicy::AcceleratorOnly,
            accelerators,
            Box::new(CpuPoolWorker::new()),
        );
        let batch: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let result = farmer.dispatch_batch(batch, |b| WorkItem::ReduceScan { batch: b });
        // dispatch itself succeeds (fire-and-forget); the failure only
        // surfaces once the task is joined.
        assert!(result.is_ok());
        let finish = farmer.finish_pass1(100);
        assert!(matches!(finish, Err(SolverError::AcceleratorUnavailable { .. })));
    }
}

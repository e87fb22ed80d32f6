//! In-process accelerator-simulation backend.
//!
//! Real accelerator runtimes (driver enumeration, kernel compilation,
//! buffer allocation) are out of scope for the core; this backend
//! models the one property the farmer's dispatch loop actually depends on,
//! asynchronous completion with a bounded, nonzero latency, without
//! requiring accelerator hardware. A production build would swap this
//! module for a real backend behind the same `ComputeWorker` trait; no
//! farmer code would change.
//!
//! Unlike the CPU backend (a `std::thread::JoinHandle` polled via
//! `is_finished`), completion here is reported through a bounded
//! `crossbeam` channel: it reads as a clearer model of "a device signals
//! task-done" than a raw join handle, matching how this codebase already
//! prefers a channel handoff over a condvar pair at an async boundary.

use super::{bin_batch, reduce_scan, ComputeWorker, PartialResult, WorkItem};
use crate::error::SolverError;
use crossbeam::channel::{self, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type TaskResult = Result<PartialResult, SolverError>;

/// Fixed set of device names the simulated backend reports as discovered,
/// exercising the CLI's device-selection path end to end.
pub fn simulated_device_names() -> Vec<String> {
    vec!["gpu0".to_string(), "gpu1".to_string()]
}

struct Slot {
    in_flight: Mutex<Option<Receiver<TaskResult>>>,
    ready: Mutex<Option<TaskResult>>,
}

impl Slot {
    fn new() -> Self {
        Slot {
            in_flight: Mutex::new(None),
            ready: Mutex::new(None),
        }
    }

    /// Moves a finished channel message into `ready`, if one has arrived,
    /// without blocking.
    fn poll(&self) {
        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(rx) = in_flight.as_ref() {
            if let Ok(result) = rx.try_recv() {
                *self.ready.lock().unwrap() = Some(result);
                *in_flight = None;
            }
        }
    }

    fn is_idle(&self) -> bool {
        self.poll();
        self.in_flight.lock().unwrap().is_none()
    }

    fn has_result(&self) -> bool {
        self.poll();
        self.ready.lock().unwrap().is_some()
    }

    fn set(&self, rx: Receiver<TaskResult>) {
        let mut in_flight = self.in_flight.lock().unwrap();
        assert!(in_flight.is_none(), "dispatch called on a busy worker");
        assert!(self.ready.lock().unwrap().is_none(), "dispatch called before prior result was joined");
        *in_flight = Some(rx);
    }

    fn join(&self) -> TaskResult {
        if let Some(result) = self.ready.lock().unwrap().take() {
            return result;
        }
        let rx = self
            .in_flight
            .lock()
            .unwrap()
            .take()
            .expect("join called on an idle worker");
        rx.recv().expect("accelerator task disconnected before sending a result")
    }
}

/// One simulated accelerator device.
pub struct AcceleratorWorker {
    name: String,
    slot: Slot,
    /// Simulated per-chunk completion latency.
    latency: Duration,
    /// When set, every dispatched task reports `AcceleratorUnavailable`
    /// instead of computing a result, used to exercise the farmer's
    /// fallback-to-CPU / abort-under-`AcceleratorOnly` policy without
    /// requiring real accelerator hardware to fail.
    simulate_failure: AtomicBool,
}

impl AcceleratorWorker {
    pub fn new(name: impl Into<String>) -> Self {
        AcceleratorWorker {
            name: name.into(),
            slot: Slot::new(),
            latency: Duration::from_micros(200),
            simulate_failure: AtomicBool::new(false),
        }
    }

    /// Builder variant that fails every dispatched task, as if the device's
    /// kernel compile / buffer allocation failed (`AcceleratorUnavailable`).
    pub fn always_failing(name: impl Into<String>) -> Self {
        let worker = Self::new(name);
        worker.simulate_failure.store(true, Ordering::Relaxed);
        worker
    }
}

impl ComputeWorker for AcceleratorWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_idle(&self) -> bool {
        self.slot.is_idle()
    }

    fn has_result(&self) -> bool {
        self.slot.has_result()
    }

    fn dispatch(&self, item: WorkItem) {
        let (tx, rx) = channel::bounded(1);
        let latency = self.latency;
        let device = self.name.clone();
        let should_fail = self.simulate_failure.load(Ordering::Relaxed);
        std::thread::spawn(move || {
            std::thread::sleep(latency);
            let result: TaskResult = if should_fail {
                Err(SolverError::AcceleratorUnavailable {
                    device,
                    reason: "simulated kernel compile / buffer allocation failure".to_string(),
                })
            } else {
                Ok(match item {
                    WorkItem::ReduceScan { batch } => {
                        PartialResult::ReduceScan(reduce_scan(&batch))
                    }
                    WorkItem::Bin { batch, size, min, k } => {
                        PartialResult::Bin(bin_batch(&batch, size, min, k))
                    }
                })
            };
            let _ = tx.send(result);
        });
        self.slot.set(rx);
    }

    fn join(&self) -> TaskResult {
        self.slot.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_busy_until_task_completes() {
        let worker = AcceleratorWorker::new("gpu0");
        assert!(worker.is_idle());
        worker.dispatch(WorkItem::ReduceScan {
            batch: vec![1.0, 2.0, 3.0],
        });
        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        while !worker.is_idle() {
            assert!(
                std::time::Instant::now() < deadline,
                "worker never became idle"
            );
            std::thread::yield_now();
        }
        match worker.join().unwrap() {
            PartialResult::ReduceScan(scan) => assert_eq!(scan.max_pos, 3.0),
            _ => panic!("expected ReduceScan result"),
        }
    }

    #[test]
    fn always_failing_worker_reports_accelerator_unavailable() {
        let worker = AcceleratorWorker::always_failing("gpu0");
        worker.dispatch(WorkItem::ReduceScan {
            batch: vec![1.0, 2.0],
        });
        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        while !worker.is_idle() {
            assert!(std::time::Instant::now() < deadline, "worker never became idle");
            std::thread::yield_now();
        }
        match worker.join() {
            Err(SolverError::AcceleratorUnavailable { device, .. }) => assert_eq!(device, "gpu0"),
            other => panic!("expected AcceleratorUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn has_result_is_false_until_the_task_finishes() {
        let worker = AcceleratorWorker::new("gpu0");
        worker.dispatch(WorkItem::Bin {
            batch: vec![1.0, 2.0],
            size: 1.0,
            min: 0.0,
            k: 4,
        });
        while !worker.has_result() {
            std::thread::yield_now();
        }
        assert!(worker.is_idle());
        worker.join().unwrap();
    }

    #[test]
    fn simulated_devices_are_named_and_stable() {
        let names = simulated_device_names();
        assert_eq!(names, vec!["gpu0", "gpu1"]);
    }
}

//! Diagnostic-only liveness timer.
//!
//! An explicit object owned by the pass driver, not a singleton: the
//! driver resets it after every processed batch, and a background thread
//! wakes periodically to check whether the deadline since the last reset
//! has elapsed. It never aborts or interrupts work. A real watchdog
//! would page an operator; this one logs a warning.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

struct Shared {
    last_reset: AtomicU64, // millis since `epoch`
    epoch: Instant,
    shutdown: AtomicBool,
}

/// A background liveness timer. Drop joins the background thread.
pub struct Watchdog {
    shared: Arc<Shared>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Watchdog {
    /// Spawns the background thread. `deadline` is how long a batch may
    /// go unprocessed before a warning is printed; `label` identifies the
    /// pass in the log line.
    pub fn start(deadline: Duration, label: &'static str) -> Self {
        let shared = Arc::new(Shared {
            last_reset: AtomicU64::new(0),
            epoch: Instant::now(),
            shutdown: AtomicBool::new(false),
        });
        let bg = Arc::clone(&shared);
        let handle = std::thread::spawn(move || loop {
            if bg.shutdown.load(Ordering::Relaxed) {
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
            if bg.shutdown.load(Ordering::Relaxed) {
                break;
            }
            let last = bg.last_reset.load(Ordering::Relaxed);
            let now = bg.epoch.elapsed().as_millis() as u64;
            if now.saturating_sub(last) > deadline.as_millis() as u64 {
                warn!(pass = label, idle_ms = now - last, "watchdog: no batch progress within deadline");
            }
        });
        Watchdog {
            shared,
            handle: Some(handle),
        }
    }

    /// Resets the liveness deadline; call after every processed batch.
    pub fn reset(&self) {
        let now = self.shared.epoch.elapsed().as_millis() as u64;
        self.shared.last_reset.store(now, Ordering::Relaxed);
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_does_not_panic_and_drop_joins_cleanly() {
        let watchdog = Watchdog::start(Duration::from_secs(5), "test");
        watchdog.reset();
        std::thread::sleep(Duration::from_millis(10));
        watchdog.reset();
        drop(watchdog);
    }
}

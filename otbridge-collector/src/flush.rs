//! Recurring buffered-span flush timer.
//!
//! Each per-thread tracer owns one [`FlushTimer`]; it shares the tracer's
//! lifetime exactly, firing on a runtime-overridable cadence and vanishing
//! when the owning entry is dropped at worker teardown.

use std::sync::Arc;
use std::time::Duration;

use otbridge::config::RuntimeOverrides;
use otbridge::stats::ReporterStats;

/// Runtime override key for the flush cadence.
pub const FLUSH_INTERVAL_KEY: &str = "tracing.collector.flush_interval_ms";

/// Recurring per-thread flush task. Aborts on drop.
#[derive(Debug)]
pub struct FlushTimer {
    task: tokio::task::JoinHandle<()>,
}

impl FlushTimer {
    /// Arm the timer on the calling thread's `LocalSet`.
    ///
    /// `on_flush` runs once per interval on this thread. The interval is
    /// re-read through `overrides` after every change-over, so operators can
    /// retune a live process.
    pub fn spawn(
        overrides: Arc<dyn RuntimeOverrides>,
        default_interval_ms: u64,
        stats: Arc<ReporterStats>,
        on_flush: impl Fn() + 'static,
    ) -> Self {
        let task = tokio::task::spawn_local(async move {
            let mut interval_ms = overrides
                .get_u64(FLUSH_INTERVAL_KEY, default_interval_ms)
                .max(1);
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            // The first tick fires immediately; skip it to align with the
            // interval.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                stats.timer_flushed.inc();
                on_flush();

                let current = overrides
                    .get_u64(FLUSH_INTERVAL_KEY, default_interval_ms)
                    .max(1);
                if current != interval_ms {
                    interval_ms = current;
                    ticker = tokio::time::interval(Duration::from_millis(interval_ms));
                    ticker.tick().await;
                }
            }
        });
        FlushTimer { task }
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

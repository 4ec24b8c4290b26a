//! Tracer health counters.
//!
//! Per-request propagation failures are invisible on the request path by
//! design; these counters (plus warn-level logs) are the only way they
//! surface. All counters are plain relaxed atomics so the span-creation hot
//! path never takes a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Increment the counter by one.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the counter by `n`.
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Current value.
    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters charged by the generic driver orchestration.
#[derive(Debug, Default)]
pub struct TracerStats {
    /// Inbound headers carried a span context this driver could not decode.
    pub span_context_extraction_error: Counter,
    /// The active span context could not be written to outbound headers.
    pub span_context_injection_error: Counter,
}

/// Counters charged by collector-reporting drivers.
#[derive(Debug, Default)]
pub struct ReporterStats {
    /// Spans delivered to the collector, as reported by the engine.
    pub spans_sent: Counter,
    /// Recurring flush timer fires.
    pub timer_flushed: Counter,
}

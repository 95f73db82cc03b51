//! Dispatch counters.

use crate::{DispatchObserver, DispatchOutcome, DispatchRecord};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counts routed events by outcome.
///
/// Cloning is cheap; clones share the same counters. Attach one clone to a
/// [`ShardSession`](crate::ShardSession) and read from another.
#[derive(Debug, Clone, Default)]
pub struct DispatchMetrics {
    inner: Arc<DispatchMetricsInner>,
}

#[derive(Debug, Default)]
struct DispatchMetricsInner {
    handled: AtomicU64,
    ignored: AtomicU64,
    failed: AtomicU64,
    busy_micros: AtomicU64,
    last_dispatch: parking_lot::Mutex<Option<Instant>>,
}

impl DispatchMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events a handler applied.
    pub fn handled(&self) -> u64 {
        self.inner.handled.load(Ordering::Relaxed)
    }

    /// Events with no handler.
    pub fn ignored(&self) -> u64 {
        self.inner.ignored.load(Ordering::Relaxed)
    }

    /// Events whose decoding or handler failed.
    pub fn failed(&self) -> u64 {
        self.inner.failed.load(Ordering::Relaxed)
    }

    /// Every routed event.
    pub fn total(&self) -> u64 {
        self.handled() + self.ignored() + self.failed()
    }

    /// Total time spent decoding and handling.
    pub fn busy(&self) -> Duration {
        Duration::from_micros(self.inner.busy_micros.load(Ordering::Relaxed))
    }

    /// Time since the last routed event.
    pub fn time_since_dispatch(&self) -> Option<Duration> {
        self.inner
            .last_dispatch
            .lock()
            .map(|instant| instant.elapsed())
    }

    /// Share of routed events that did not fail (1.0 before any event).
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 1.0;
        }
        total.saturating_sub(self.failed()) as f64 / total as f64
    }

    /// Serializable copy of the current counts.
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            handled: self.handled(),
            ignored: self.ignored(),
            failed: self.failed(),
            busy_ms: self.busy().as_millis() as u64,
            success_rate: self.success_rate(),
        }
    }
}

impl DispatchObserver for DispatchMetrics {
    fn on_dispatch(&self, record: &DispatchRecord<'_>) {
        let counter = match record.outcome {
            DispatchOutcome::Handled => &self.inner.handled,
            DispatchOutcome::Ignored => &self.inner.ignored,
            DispatchOutcome::Failed => &self.inner.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.inner
            .busy_micros
            .fetch_add(record.elapsed.as_micros() as u64, Ordering::Relaxed);
        *self.inner.last_dispatch.lock() = Some(Instant::now());
    }
}

/// Point-in-time dispatch counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DispatchMetricsSnapshot {
    /// Events a handler applied
    pub handled: u64,
    /// Events with no handler
    pub ignored: u64,
    /// Events whose decoding or handler failed
    pub failed: u64,
    /// Milliseconds spent decoding and handling
    pub busy_ms: u64,
    /// Share of events that did not fail
    pub success_rate: f64,
}

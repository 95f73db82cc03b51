//! Command counters for document stores.

use crate::{CommandObserver, CommandRecord};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counts store commands as an [`ObservedStore`](crate::ObservedStore)
/// reports them.
///
/// Cloning is cheap; clones share the same counters, so one handle can be
/// given to the store and another kept for reading.
///
/// # Example
///
/// ```
/// use guildsync_store::{DocumentStore, MemoryStore, ObservedStore, StoreMetrics};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let metrics = StoreMetrics::new();
/// let store = ObservedStore::new(Arc::new(MemoryStore::new()), Arc::new(metrics.clone()));
/// store.incr("shard:0:guild_count").await?;
/// assert_eq!(metrics.commands(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StoreMetrics {
    inner: Arc<StoreMetricsInner>,
}

#[derive(Debug, Default)]
struct StoreMetricsInner {
    commands: AtomicU64,
    failures: AtomicU64,
    busy_micros: AtomicU64,
}

impl StoreMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands issued.
    pub fn commands(&self) -> u64 {
        self.inner.commands.load(Ordering::Relaxed)
    }

    /// Commands that failed.
    pub fn failures(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    /// Total time spent waiting on the store.
    pub fn busy(&self) -> Duration {
        Duration::from_micros(self.inner.busy_micros.load(Ordering::Relaxed))
    }

    /// Serializable copy of the current counts.
    pub fn snapshot(&self) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot {
            commands: self.commands(),
            failures: self.failures(),
            busy_ms: self.busy().as_millis() as u64,
        }
    }
}

impl CommandObserver for StoreMetrics {
    fn on_command(&self, record: &CommandRecord<'_>) {
        self.inner.commands.fetch_add(1, Ordering::Relaxed);
        if !record.succeeded {
            self.inner.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.inner
            .busy_micros
            .fetch_add(record.elapsed.as_micros() as u64, Ordering::Relaxed);
    }
}

/// Point-in-time store counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreMetricsSnapshot {
    /// Commands issued
    pub commands: u64,
    /// Commands that failed
    pub failures: u64,
    /// Milliseconds spent waiting on the store
    pub busy_ms: u64,
}

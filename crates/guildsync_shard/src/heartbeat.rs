//! Shard liveness markers.

use crate::PeriodicTask;
use guildsync_core::keys::shard_active_key;
use guildsync_error::{ConfigError, GuildsyncResult};
use guildsync_store::SharedStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Default period between marker renewals.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Default lifetime of a liveness marker.
pub const DEFAULT_ACTIVE_MARKER_TTL: Duration = Duration::from_secs(30);

/// Renewal period and marker lifetime.
///
/// The period may be at most half the lifetime, so a marker is renewed at
/// least once before it lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatTiming {
    interval: Duration,
    ttl: Duration,
}

impl HeartbeatTiming {
    /// Validate a timing pair.
    pub fn new(interval: Duration, ttl: Duration) -> GuildsyncResult<Self> {
        if interval.is_zero() || interval.saturating_mul(2) > ttl {
            return Err(ConfigError::new(format!(
                "heartbeat interval {:?} must be non-zero and at most half the marker ttl {:?}",
                interval, ttl
            ))
            .into());
        }
        Ok(Self { interval, ttl })
    }

    /// Renewal period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Marker lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for HeartbeatTiming {
    fn default() -> Self {
        Self {
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            ttl: DEFAULT_ACTIVE_MARKER_TTL,
        }
    }
}

/// Keeps `shard:{n}:active` alive while a shard session runs.
#[derive(Clone)]
pub struct ShardHeartbeat {
    store: SharedStore,
    shard_id: u32,
    timing: HeartbeatTiming,
}

impl std::fmt::Debug for ShardHeartbeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardHeartbeat")
            .field("shard_id", &self.shard_id)
            .field("timing", &self.timing)
            .finish()
    }
}

impl ShardHeartbeat {
    /// Create a heartbeat for `shard_id`.
    pub fn new(store: SharedStore, shard_id: u32, timing: HeartbeatTiming) -> Self {
        Self {
            store,
            shard_id,
            timing,
        }
    }

    /// Write the marker once.
    pub async fn beat(&self) -> GuildsyncResult<()> {
        self.store
            .set(
                &shard_active_key(self.shard_id),
                "1",
                Some(self.timing.ttl()),
            )
            .await?;
        trace!(shard_id = self.shard_id, "Shard heartbeat written");
        Ok(())
    }

    /// Renew the marker on the configured period until the task is stopped.
    pub fn start(self) -> PeriodicTask {
        let interval = self.timing.interval();
        let heartbeat = Arc::new(self);
        PeriodicTask::spawn("shard-heartbeat", interval, move || {
            let heartbeat = heartbeat.clone();
            async move { heartbeat.beat().await }
        })
    }
}

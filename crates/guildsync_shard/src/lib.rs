//! Shard registry for guildsync.
//!
//! The guild population is partitioned across a fixed number of shards by
//! `(guild_id >> 22) % shard_count`. This crate owns everything keyed by
//! shard:
//!
//! - [`ShardCount`] and [`shard_id_for`], the assignment formula
//! - [`ShardRegistry`], the per-shard guild sets and counters, plus the
//!   shard-count invariant check
//! - [`ShardHeartbeat`], the liveness marker a connected shard renews
//! - [`InactiveShardCache`], the reader-side view of expired markers
//! - [`PeriodicTask`], the stoppable timer both of the above run on

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod count;
mod heartbeat;
mod inactive;
mod registry;
mod task;

pub use count::{ShardCount, shard_id_for};
pub use heartbeat::{
    DEFAULT_ACTIVE_MARKER_TTL, DEFAULT_HEARTBEAT_INTERVAL, HeartbeatTiming, ShardHeartbeat,
};
pub use inactive::{DEFAULT_POLL_INTERVAL, InactiveShardCache};
pub use registry::ShardRegistry;
pub use task::PeriodicTask;

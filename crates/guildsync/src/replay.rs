//! Offline replay of captured dispatch streams.

use derive_getters::Getters;
use guildsync_error::{GuildsyncError, GuildsyncResult};
use guildsync_gateway::{RawDispatch, ShardSession};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

/// Capacity of the channel between the line reader and the session.
const REPLAY_BUFFER: usize = 256;

/// What a replay fed through the session and what the cache holds after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct ReplaySummary {
    /// Dispatch records handed to the session
    events: usize,
    /// Lines that were not dispatch records
    skipped: usize,
    /// Guild counter per shard
    shard_counts: BTreeMap<u32, i64>,
    /// Sum of the shard counters
    total_guilds: i64,
}

/// Feed newline-delimited `{"t": name, "d": payload}` records through
/// `session` until `reader` is exhausted.
///
/// The reader and the session run concurrently over a bounded channel.
/// Blank lines are ignored and malformed ones are logged and skipped; read
/// errors and a failed connect end the replay.
///
/// # Example
///
/// ```
/// use guildsync::replay;
/// use guildsync_gateway::{SessionConfigBuilder, ShardSession};
/// use guildsync_shard::ShardCount;
/// use guildsync_store::MemoryStore;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = SessionConfigBuilder::default()
///     .shard_id(0u32)
///     .shard_count(ShardCount::ONE)
///     .build()
///     .unwrap();
/// let mut session = ShardSession::new(Arc::new(MemoryStore::new()), config);
///
/// let input = br#"{"t":"READY","d":{"user":{"id":"1"},"guilds":[],"session_id":"s","shard":[0,1]}}
/// not json
/// "#;
/// let summary = replay(&mut session, &input[..]).await.unwrap();
/// assert_eq!(*summary.events(), 1);
/// assert_eq!(*summary.skipped(), 1);
/// # }
/// ```
#[instrument(skip_all, fields(shard_id = session.config().shard_id()))]
pub async fn replay<R>(session: &mut ShardSession, reader: R) -> GuildsyncResult<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let (tx, rx) = mpsc::channel(REPLAY_BUFFER);

    let feed = async move {
        let mut lines = reader.lines();
        let mut line_number = 0usize;
        let mut events = 0usize;
        let mut skipped = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_number += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawDispatch>(line) {
                Ok(raw) => {
                    if tx.send(raw).await.is_err() {
                        warn!(line = line_number, "Session stopped before the input ended");
                        break;
                    }
                    events += 1;
                }
                Err(e) => {
                    warn!(line = line_number, error = %e, "Skipping malformed dispatch record");
                    skipped += 1;
                }
            }
        }
        Ok::<_, GuildsyncError>((events, skipped))
    };

    let (fed, ran) = tokio::join!(feed, session.run(rx));
    ran?;
    let (events, skipped) = fed?;

    let registry = session.registry();
    let mut shard_counts = BTreeMap::new();
    for shard_id in registry.count().shard_ids() {
        shard_counts.insert(shard_id, registry.guild_count(shard_id).await?);
    }
    let total_guilds = shard_counts.values().sum();

    info!(events, skipped, total_guilds, "Replay finished");
    Ok(ReplaySummary {
        events,
        skipped,
        shard_counts,
        total_guilds,
    })
}

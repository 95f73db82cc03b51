//! Cache condition error types.
//!
//! These are the distinguished conditions readers and handlers branch on.
//! Most of them are recoverable: a missing guild triggers a create, an
//! unavailable guild triggers an overwrite.

/// Specific cache conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CacheErrorKind {
    /// The guild key does not exist
    #[display("Guild not found: {}", _0)]
    GuildNotFound(u64),

    /// The guild is an unavailable placeholder
    #[display("Guild unavailable: {}", _0)]
    GuildUnavailable(u64),

    /// The channel is not cached in its guild
    #[display("Channel {} not cached in guild {}", channel_id, guild_id)]
    ChannelNotFound {
        /// Owning guild
        guild_id: u64,
        /// Missing channel
        channel_id: u64,
    },

    /// The configured shard count differs from the persisted one
    #[display(
        "Shard count mismatch: configured {} but cache was built with {}",
        configured,
        persisted
    )]
    ShardCountMismatch {
        /// Shard count this process was started with
        configured: u32,
        /// Shard count found in the store
        persisted: u32,
    },

    /// The shard owning the guild has no live heartbeat
    #[display("Shard {} owning guild {} is inactive", shard_id, guild_id)]
    ShardInactive {
        /// Inactive shard
        shard_id: u32,
        /// Guild that was looked up
        guild_id: u64,
    },

    /// No subject identity has been recorded yet
    #[display("Client identity not recorded; READY has not been processed")]
    MissingClientId,
}

/// Cache error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cache Error: {} at line {} in {}", kind, line, file)]
pub struct CacheError {
    /// The specific error kind
    pub kind: CacheErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl CacheError {
    /// Create a new cache error with location tracking.
    #[track_caller]
    pub fn new(kind: CacheErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CacheErrorKind {
        &self.kind
    }

    /// Whether processing may not continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, CacheErrorKind::ShardCountMismatch { .. })
    }
}

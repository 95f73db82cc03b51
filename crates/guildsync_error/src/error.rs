//! Top-level error wrapper types.

use crate::{CacheError, CacheErrorKind, ConfigError, IoError, JsonError, StoreError};

/// Every error a guildsync operation can produce.
///
/// # Examples
///
/// ```
/// use guildsync_error::{GuildsyncError, StoreError, StoreErrorKind};
///
/// let store_err = StoreError::new(StoreErrorKind::Connection("refused".into()));
/// let err: GuildsyncError = store_err.into();
/// assert!(format!("{}", err).contains("Store Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum GuildsyncErrorKind {
    /// Distinguished cache condition
    #[from(CacheError)]
    Cache(CacheError),
    /// Document store failure
    #[from(StoreError)]
    Store(StoreError),
    /// JSON payload could not be decoded
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Input could not be read
    #[from(IoError)]
    Io(IoError),
}

impl From<serde_json::Error> for GuildsyncErrorKind {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        GuildsyncErrorKind::Json(JsonError::from(err))
    }
}

impl From<std::io::Error> for GuildsyncErrorKind {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        GuildsyncErrorKind::Io(IoError::from(err))
    }
}

/// guildsync error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("guildsync Error: {}", _0)]
pub struct GuildsyncError(Box<GuildsyncErrorKind>);

impl GuildsyncError {
    /// Create a new error from a kind.
    pub fn new(kind: GuildsyncErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &GuildsyncErrorKind {
        &self.0
    }

    /// The cache condition, if this is one.
    pub fn cache_kind(&self) -> Option<&CacheErrorKind> {
        match self.kind() {
            GuildsyncErrorKind::Cache(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// True for [`CacheErrorKind::GuildNotFound`].
    pub fn is_guild_not_found(&self) -> bool {
        matches!(self.cache_kind(), Some(CacheErrorKind::GuildNotFound(_)))
    }

    /// True for [`CacheErrorKind::GuildUnavailable`].
    pub fn is_guild_unavailable(&self) -> bool {
        matches!(self.cache_kind(), Some(CacheErrorKind::GuildUnavailable(_)))
    }

    /// True for [`CacheErrorKind::ShardInactive`].
    pub fn is_shard_inactive(&self) -> bool {
        matches!(self.cache_kind(), Some(CacheErrorKind::ShardInactive { .. }))
    }

    /// True when the store rejected a command.
    pub fn is_command_error(&self) -> bool {
        matches!(self.kind(), GuildsyncErrorKind::Store(err) if err.is_command())
    }

    /// True when the error must halt the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), GuildsyncErrorKind::Cache(err) if err.is_fatal())
    }
}

// Generic From implementation for any type that converts to GuildsyncErrorKind
impl<T> From<T> for GuildsyncError
where
    T: Into<GuildsyncErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for guildsync operations.
pub type GuildsyncResult<T> = std::result::Result<T, GuildsyncError>;

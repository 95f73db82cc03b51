//! Document store error types.

/// Kinds of document store errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StoreErrorKind {
    /// The store rejected the command (bad path, missing parent, ...).
    ///
    /// Writes below the root of a key that does not exist fail this way, so
    /// best-effort writers treat it as "the owning document is gone".
    #[display("Command {} failed: {}", command, message)]
    Command {
        /// Command name (e.g. `JSON.SET`)
        command: String,
        /// Reason reported by the store
        message: String,
    },
    /// The addressed key does not exist
    #[display("Key not found: {}", _0)]
    KeyNotFound(String),
    /// The value at the key or path has the wrong type for the command
    #[display("Wrong type at {}: {}", key, message)]
    WrongType {
        /// Key that was addressed
        key: String,
        /// Description of the mismatch
        message: String,
    },
    /// A value could not be encoded or decoded
    #[display("Serialization failed: {}", _0)]
    Serialization(String),
    /// The store could not be reached
    #[display("Connection failed: {}", _0)]
    Connection(String),
}

/// Document store error with location tracking.
///
/// # Examples
///
/// ```
/// use guildsync_error::{StoreError, StoreErrorKind};
///
/// let err = StoreError::new(StoreErrorKind::KeyNotFound("guild:1".to_string()));
/// assert!(format!("{}", err).contains("guild:1"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Store Error: {} at line {} in {}", kind, line, file)]
pub struct StoreError {
    /// The kind of error that occurred
    pub kind: StoreErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StoreError {
    /// Create a new store error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoreErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a rejected command.
    #[track_caller]
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Command {
            command: command.into(),
            message: message.into(),
        })
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StoreErrorKind {
        &self.kind
    }

    /// True when the store rejected the command itself.
    pub fn is_command(&self) -> bool {
        matches!(self.kind, StoreErrorKind::Command { .. })
    }

    /// True when the addressed key does not exist.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self.kind, StoreErrorKind::KeyNotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        StoreError::new(StoreErrorKind::Serialization(err.to_string()))
    }
}

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

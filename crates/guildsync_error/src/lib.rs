//! Error types for guildsync.
//!
//! This crate provides the error taxonomy shared by every guildsync crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! The conditions the cache engine branches on live in [`CacheErrorKind`]
//! (`GuildNotFound`, `GuildUnavailable`, `ShardInactive`, ...). Failures
//! reported by the document store live in [`StoreErrorKind`].
//!
//! # Examples
//!
//! ```
//! use guildsync_error::{CacheError, CacheErrorKind, GuildsyncResult};
//!
//! fn lookup(id: u64) -> GuildsyncResult<String> {
//!     Err(CacheError::new(CacheErrorKind::GuildNotFound(id)))?
//! }
//!
//! let err = lookup(42).unwrap_err();
//! assert!(err.is_guild_not_found());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod io;
mod json;
mod store;

pub use cache::{CacheError, CacheErrorKind};
pub use config::ConfigError;
pub use error::{GuildsyncError, GuildsyncErrorKind, GuildsyncResult};
pub use io::IoError;
pub use json::JsonError;
pub use store::{StoreError, StoreErrorKind, StoreResult};

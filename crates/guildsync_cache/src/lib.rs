//! Per-field value caching with TTL support.
//!
//! Aggregate handles read individual fields (a guild's name, owner, the
//! bot's roles) repeatedly within a short window. This crate keeps those
//! values for a fixed, short expiry to save store round trips. Nothing may
//! rely on a cached value for correctness beyond its TTL.

#![warn(missing_docs)]

mod cache;

pub use cache::{
    CacheEntry, DEFAULT_FIELD_TTL_SECS, FieldCache, FieldCacheConfig, FieldCacheConfigBuilder,
};

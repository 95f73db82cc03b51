//! Field cache implementation.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Default lifetime of a cached field, in seconds.
pub const DEFAULT_FIELD_TTL_SECS: u64 = 15;

/// One cached field value and the instant it stops being served.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    /// Whether the entry's lifetime has run out.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Lifetime left, `None` once expired.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.expires_at.checked_duration_since(Instant::now())
    }
}

/// Field cache settings, loadable from the `[cache]` config section.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct FieldCacheConfig {
    /// Lifetime of a cached field, in seconds
    #[serde(default = "default_ttl")]
    ttl_secs: u64,

    /// Fields held per handle before the least recently used is evicted
    #[serde(default = "default_max_size")]
    max_size: usize,

    /// When false, nothing is cached
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_ttl() -> u64 {
    DEFAULT_FIELD_TTL_SECS
}

fn default_max_size() -> usize {
    64
}

fn default_enabled() -> bool {
    true
}

impl Default for FieldCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            max_size: default_max_size(),
            enabled: default_enabled(),
        }
    }
}

/// TTL cache of document fields, keyed by field path.
///
/// Once `max_size` fields are held, inserting a new one evicts the field
/// that was read or written least recently. A disabled cache stores nothing.
///
/// # Example
///
/// ```
/// use guildsync_cache::{FieldCache, FieldCacheConfig};
/// use serde_json::json;
///
/// let mut cache = FieldCache::new(FieldCacheConfig::default());
/// cache.insert("owner_id", json!("80351110224678912"), None);
///
/// if let Some(entry) = cache.get("owner_id") {
///     assert_eq!(entry.value(), &json!("80351110224678912"));
/// }
/// ```
#[derive(Debug)]
pub struct FieldCache {
    config: FieldCacheConfig,
    entries: HashMap<String, CacheEntry>,
    /// Field paths, least recently used first
    recency: VecDeque<String>,
}

impl FieldCache {
    /// Create an empty cache.
    pub fn new(config: FieldCacheConfig) -> Self {
        tracing::trace!(?config, "Field cache created");
        Self {
            config,
            entries: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    /// Cache `value` for `field`, using the configured TTL unless `ttl` is given.
    pub fn insert(&mut self, field: &str, value: Value, ttl: Option<Duration>) {
        if !self.config.enabled {
            return;
        }

        let ttl = ttl.unwrap_or(Duration::from_secs(self.config.ttl_secs));
        if !self.entries.contains_key(field)
            && self.entries.len() >= self.config.max_size
            && let Some(oldest) = self.recency.pop_front()
        {
            tracing::trace!(field = %oldest, "Field evicted");
            self.entries.remove(&oldest);
        }

        self.mark_used(field);
        self.entries.insert(
            field.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// The live entry for `field`.
    ///
    /// Expired entries are dropped on the way and read as misses, as is
    /// everything while the cache is disabled.
    pub fn get(&mut self, field: &str) -> Option<&CacheEntry> {
        if !self.config.enabled {
            return None;
        }

        if self.entries.get(field)?.is_expired() {
            tracing::trace!(field, "Cached field expired");
            self.invalidate(field);
            return None;
        }

        self.mark_used(field);
        let entry = self.entries.get(field)?;
        tracing::trace!(field, remaining = ?entry.time_remaining(), "Field cache hit");
        Some(entry)
    }

    /// Drop one cached field, typically after writing it.
    pub fn invalidate(&mut self, field: &str) {
        self.entries.remove(field);
        self.recency.retain(|used| used != field);
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(field, _)| field.clone())
            .collect();
        for field in &expired {
            self.invalidate(field);
        }
        expired.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    /// Number of entries held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn mark_used(&mut self, field: &str) {
        self.recency.retain(|used| used != field);
        self.recency.push_back(field.to_string());
    }
}

impl Default for FieldCache {
    fn default() -> Self {
        Self::new(FieldCacheConfig::default())
    }
}

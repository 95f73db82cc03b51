//! Shard count and the guild-to-shard formula.

use guildsync_core::Snowflake;
use guildsync_error::{ConfigError, GuildsyncResult};
use std::num::NonZeroU32;

/// Number of shards the guild population is split across.
///
/// Fixed for the lifetime of a cache: changing it reassigns guilds to
/// different shards, so a cache built with one count must be cleared before
/// another is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub struct ShardCount(NonZeroU32);

impl ShardCount {
    /// A single shard.
    pub const ONE: ShardCount = ShardCount(NonZeroU32::MIN);

    /// Validate a raw count.
    pub fn new(count: u32) -> GuildsyncResult<Self> {
        NonZeroU32::new(count)
            .map(ShardCount)
            .ok_or_else(|| ConfigError::new("shard count must be at least 1").into())
    }

    /// The raw count.
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Shard IDs `0..count`.
    pub fn shard_ids(self) -> std::ops::Range<u32> {
        0..self.get()
    }

    /// Shard owning `guild_id`.
    pub fn shard_for(self, guild_id: Snowflake) -> u32 {
        shard_id_for(guild_id, self)
    }
}

/// `(guild_id >> 22) % count`.
///
/// # Example
///
/// ```
/// use guildsync_core::Snowflake;
/// use guildsync_shard::{ShardCount, shard_id_for};
///
/// let count = ShardCount::new(4).unwrap();
/// assert_eq!(shard_id_for(Snowflake::new(41771983423143937), count), 2);
/// ```
pub fn shard_id_for(guild_id: Snowflake, count: ShardCount) -> u32 {
    let shard = (guild_id.get() >> 22) % u64::from(count.get());
    // The remainder is below a u32 count.
    shard as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_rejected() {
        assert!(ShardCount::new(0).is_err());
        assert_eq!(ShardCount::new(1).unwrap(), ShardCount::ONE);
    }

    #[test]
    fn test_formula_matches_shift_and_modulo() {
        for raw in [0u64, 1 << 22, 41771983423143937, 175928847299117063, u64::MAX] {
            for n in [1u32, 2, 3, 16, 1000] {
                let count = ShardCount::new(n).unwrap();
                let expected = (raw >> 22) % u64::from(n);
                let shard = shard_id_for(Snowflake::new(raw), count);
                assert_eq!(u64::from(shard), expected);
                assert!(shard < n);
                // Stable for a fixed count
                assert_eq!(shard, count.shard_for(Snowflake::new(raw)));
            }
        }
    }

    #[test]
    fn test_low_bits_do_not_affect_shard() {
        let count = ShardCount::new(7).unwrap();
        let base = 123_456u64 << 22;
        let a = shard_id_for(Snowflake::new(base), count);
        let b = shard_id_for(Snowflake::new(base | 0x3F_FFFF), count);
        assert_eq!(a, b);
    }
}

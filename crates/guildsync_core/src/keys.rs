//! Store key layout.
//!
//! | Key | Kind | Holds |
//! |-----|------|-------|
//! | `guild:{id}` | document | [`CachedGuild`](crate::CachedGuild) or the unavailable placeholder |
//! | `shard:{n}` | document | JSON array of guild IDs owned by shard `n` |
//! | `shard:{n}:guild_count` | scalar | running guild counter of shard `n` |
//! | `shard:{n}:active` | scalar, expiring | liveness marker of shard `n` |
//! | `shard_count` | scalar | shard count the cache was built with |
//! | `client_id` | scalar | user ID of the caching bot |

use crate::Snowflake;

/// Scalar key holding the shard count the cache was built with.
pub const SHARD_COUNT_KEY: &str = "shard_count";

/// Scalar key holding the caching bot's user ID.
pub const CLIENT_ID_KEY: &str = "client_id";

/// Pattern matching every per-shard key.
pub const SHARD_KEY_PATTERN: &str = "shard:*";

/// Document key of a guild.
pub fn guild_key(id: Snowflake) -> String {
    format!("guild:{}", id)
}

/// Document key of a shard's guild-ID array.
pub fn shard_key(shard_id: u32) -> String {
    format!("shard:{}", shard_id)
}

/// Scalar key of a shard's guild counter.
pub fn shard_guild_count_key(shard_id: u32) -> String {
    format!("shard:{}:guild_count", shard_id)
}

/// Scalar key of a shard's liveness marker.
pub fn shard_active_key(shard_id: u32) -> String {
    format!("shard:{}:active", shard_id)
}

/// Shard number embedded in any `shard:{n}` or `shard:{n}:*` key.
pub fn parse_shard_key(key: &str) -> Option<u32> {
    let rest = key.strip_prefix("shard:")?;
    let number = rest.split(':').next()?;
    number.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = Snowflake::new(41771983423143937);
        assert_eq!(guild_key(id), "guild:41771983423143937");
        assert_eq!(shard_key(3), "shard:3");
        assert_eq!(shard_guild_count_key(3), "shard:3:guild_count");
        assert_eq!(shard_active_key(3), "shard:3:active");
    }

    #[test]
    fn test_parse_shard_key() {
        assert_eq!(parse_shard_key("shard:12"), Some(12));
        assert_eq!(parse_shard_key("shard:12:active"), Some(12));
        assert_eq!(parse_shard_key("shard_count"), None);
        assert_eq!(parse_shard_key("guild:1"), None);
    }
}

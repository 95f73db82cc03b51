//! Configuration loading.
//!
//! Sources, later ones overriding earlier ones:
//! - bundled defaults (`include_str!` of `guildsync.toml` shipped with the crate)
//! - a user file (`./guildsync.toml`, or an explicit path)
//! - `GUILDSYNC_*` environment variables, sections separated by `__`
//!   (`GUILDSYNC_DISCORD__SHARD_COUNT=4`)

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use guildsync_cache::FieldCacheConfig;
use guildsync_core::Snowflake;
use guildsync_error::{ConfigError, GuildsyncError, GuildsyncResult};
use guildsync_gateway::{SessionConfig, SessionConfigBuilder};
use guildsync_shard::{HeartbeatTiming, ShardCount};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../guildsync.toml");

/// Document store connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Store endpoint URL
    pub endpoint: String,
}

/// Gateway identity and sharding.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordSettings {
    /// Bot token; its first segment names the bot account
    #[serde(default)]
    pub token: Option<String>,
    /// Shard this process serves
    pub shard_id: u32,
    /// Total shard count; must never change for a populated cache
    pub shard_count: u32,
}

impl std::fmt::Debug for DiscordSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSettings")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("shard_id", &self.shard_id)
            .field("shard_count", &self.shard_count)
            .finish()
    }
}

impl DiscordSettings {
    /// User ID of the bot the token belongs to, `None` without a token.
    ///
    /// The first dot-separated segment of a bot token is the bot's user ID
    /// in base64.
    pub fn token_user_id(&self) -> GuildsyncResult<Option<Snowflake>> {
        let Some(token) = &self.token else {
            return Ok(None);
        };
        let malformed = || GuildsyncError::from(ConfigError::new("discord.token is malformed"));
        let segment = token.split('.').next().unwrap_or_default();
        let decoded = STANDARD_NO_PAD
            .decode(segment.trim_end_matches('='))
            .map_err(|_| malformed())?;
        let id = std::str::from_utf8(&decoded)
            .ok()
            .and_then(|digits| digits.parse::<u64>().ok())
            .ok_or_else(malformed)?;
        Ok(Some(Snowflake::new(id)))
    }
}

/// Liveness timers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSettings {
    /// Period between liveness marker renewals
    pub heartbeat_interval_secs: u64,
    /// Lifetime of a liveness marker
    pub active_marker_ttl_secs: u64,
    /// Period between inactive-shard polls
    pub poll_interval_secs: u64,
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of text
    #[serde(default)]
    pub json: bool,
}

/// Complete guildsync configuration.
///
/// # Example
///
/// ```
/// use guildsync::GuildsyncConfig;
///
/// let config = GuildsyncConfig::bundled().unwrap();
/// assert_eq!(config.discord.shard_count, 1);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildsyncConfig {
    /// Store connection
    pub store: StoreSettings,
    /// Identity and sharding
    pub discord: DiscordSettings,
    /// Liveness timers
    pub shard: ShardSettings,
    /// Field cache of guild handles
    #[serde(default)]
    pub cache: FieldCacheConfig,
    /// Log output
    pub logging: LoggingSettings,
}

fn config_error(context: &str, err: config::ConfigError) -> GuildsyncError {
    ConfigError::new(format!("{}: {}", context, err)).into()
}

fn bundled_builder() -> ConfigBuilder<DefaultState> {
    Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
}

fn environment() -> Environment {
    Environment::with_prefix("GUILDSYNC")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl GuildsyncConfig {
    /// The bundled defaults alone.
    pub fn bundled() -> GuildsyncResult<Self> {
        Self::finish(bundled_builder())
    }

    /// Defaults, then `./guildsync.toml` if present, then the environment.
    #[instrument]
    pub fn load() -> GuildsyncResult<Self> {
        debug!("Loading configuration: environment > ./guildsync.toml > bundled defaults");
        let builder = bundled_builder()
            .add_source(File::with_name("guildsync").required(false))
            .add_source(environment());
        Self::finish(builder)
    }

    /// Defaults, then the file at `path`, then the environment.
    ///
    /// The file must exist.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> GuildsyncResult<Self> {
        debug!("Loading configuration from file");
        let builder = bundled_builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment());
        Self::finish(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> GuildsyncResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| config_error("Failed to build configuration", e))?
            .try_deserialize()
            .map_err(|e| config_error("Failed to parse configuration", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field rules the types cannot express.
    pub fn validate(&self) -> GuildsyncResult<()> {
        self.session_config()?;
        self.discord.token_user_id()?;
        if self.shard.poll_interval_secs == 0 {
            return Err(ConfigError::new("shard.poll_interval_secs must be positive").into());
        }
        Ok(())
    }

    /// Validated shard count.
    pub fn shard_count(&self) -> GuildsyncResult<ShardCount> {
        ShardCount::new(self.discord.shard_count)
    }

    /// Validated heartbeat timing.
    pub fn heartbeat_timing(&self) -> GuildsyncResult<HeartbeatTiming> {
        HeartbeatTiming::new(
            Duration::from_secs(self.shard.heartbeat_interval_secs),
            Duration::from_secs(self.shard.active_marker_ttl_secs),
        )
    }

    /// Inactive-shard poll period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.shard.poll_interval_secs)
    }

    /// Settings for this process's shard session.
    pub fn session_config(&self) -> GuildsyncResult<SessionConfig> {
        SessionConfigBuilder::default()
            .shard_id(self.discord.shard_id)
            .shard_count(self.shard_count()?)
            .heartbeat(self.heartbeat_timing()?)
            .field_cache(self.cache.clone())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_defaults() {
        let config = GuildsyncConfig::bundled().unwrap();
        assert_eq!(config.discord.shard_id, 0);
        assert_eq!(config.discord.token, None);
        assert_eq!(config.heartbeat_timing().unwrap(), HeartbeatTiming::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.cache, FieldCacheConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let mut config = GuildsyncConfig::bundled().unwrap();
        config.discord.token = Some("secret-token".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_token_names_bot_account() {
        let mut config = GuildsyncConfig::bundled().unwrap();
        assert_eq!(config.discord.token_user_id().unwrap(), None);

        // "80351110224678912" in base64, padding dropped
        config.discord.token = Some("ODAzNTExMTAyMjQ2Nzg5MTI.GhJkLm.signature".to_string());
        assert_eq!(
            config.discord.token_user_id().unwrap(),
            Some(Snowflake::new(80351110224678912))
        );

        config.discord.token = Some("not base64!.x.y".to_string());
        assert!(config.discord.token_user_id().is_err());
    }

    #[test]
    fn test_validation_rules() {
        let valid = GuildsyncConfig::bundled().unwrap();

        let mut zero_shards = valid.clone();
        zero_shards.discord.shard_count = 0;
        assert!(zero_shards.validate().is_err());

        let mut outside = valid.clone();
        outside.discord.shard_count = 2;
        outside.discord.shard_id = 2;
        assert!(outside.validate().is_err());

        let mut slow_heartbeat = valid.clone();
        slow_heartbeat.shard.heartbeat_interval_secs = 16;
        assert!(slow_heartbeat.validate().is_err());

        let mut no_poll = valid;
        no_poll.shard.poll_interval_secs = 0;
        assert!(no_poll.validate().is_err());
    }
}

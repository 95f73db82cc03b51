//! Tracing subscriber setup.

use crate::LoggingSettings;
use guildsync_error::{ConfigError, GuildsyncResult};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `settings.level`. Fails if the filter
/// does not parse or a subscriber is already installed.
pub fn init_observability(settings: &LoggingSettings) -> GuildsyncResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| ConfigError::new(format!("Invalid log filter {:?}: {}", settings.level, e)))?;

    let fmt_layer = if settings.json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ConfigError::new(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::debug!(level = %settings.level, json = settings.json, "Tracing initialized");
    Ok(())
}

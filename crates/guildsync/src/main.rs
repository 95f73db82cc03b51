//! Guildsync CLI binary.
//!
//! Inspection of guild caches:
//! - replay newline-delimited dispatch records into an in-memory cache
//!   and print per-shard guild counts and, optionally, one cached guild
//! - report shard health and counts of the cache at `store.endpoint`

use clap::Parser;
use guildsync::{GuildsyncConfig, init_observability};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, run_replay};
    #[cfg(feature = "redis")]
    use cli::run_status;

    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GuildsyncConfig::from_file(path)?,
        None => GuildsyncConfig::load()?,
    };
    init_observability(&config.logging)?;

    match cli.command {
        Commands::Replay { events, dump } => {
            run_replay(&config, &events, dump).await?;
        }
        #[cfg(feature = "redis")]
        Commands::Status { guild } => {
            run_status(&config, guild).await?;
        }
    }

    Ok(())
}

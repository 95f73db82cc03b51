//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Guildsync - shard-partitioned guild cache fed by gateway dispatch events
#[derive(Parser, Debug)]
#[command(name = "guildsync")]
#[command(about = "Shard-partitioned guild cache fed by gateway dispatch events", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file layered over the bundled defaults
    #[arg(long, global = true, env = "GUILDSYNC_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a captured dispatch stream through an in-memory cache
    Replay {
        /// Newline-delimited `{"t": name, "d": payload}` records
        #[arg(long)]
        events: PathBuf,

        /// Print this guild's cached record afterwards
        #[arg(long)]
        dump: Option<u64>,
    },

    /// Report shard health and guild counts of the configured store
    #[cfg(feature = "redis")]
    Status {
        /// Print this guild's cached record as well
        #[arg(long)]
        guild: Option<u64>,
    },
}

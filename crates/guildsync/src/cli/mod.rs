//! Command-line interface module.

mod commands;
mod replay;
#[cfg(feature = "redis")]
mod status;

pub use commands::{Cli, Commands};
pub use replay::run_replay;
#[cfg(feature = "redis")]
pub use status::run_status;

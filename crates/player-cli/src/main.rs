//! `player`: command-line front end for the playback controller.
//!
//! ## Modes
//! - `play`: queue the given URLs or absolute paths, play them to the end and exit.
//! - `shell`: read control commands from stdin.
//!
//! Playback events go to stdout as JSON lines, logs go to stderr.

use anyhow::Result;
use clap::Parser;
use player_cli::{cli, runtime};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,player_cli=info,playback_controller=info")
        }))
        .with_writer(std::io::stderr)
        .init();
    runtime::run(args)
}

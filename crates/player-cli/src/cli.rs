use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "player", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Optional player config file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Simulated buffering delay before an item starts, in milliseconds
    #[arg(long, global = true)]
    pub buffering_ms: Option<u64>,

    /// Simulated length of every item, in milliseconds
    #[arg(long, global = true)]
    pub item_duration_ms: Option<u64>,

    /// Stop after each item instead of moving on to the next one
    #[arg(long, global = true)]
    pub no_auto_advance: bool,

    /// Refuse to queue an identifier that is already queued
    #[arg(long, global = true)]
    pub no_duplicates: bool,

    /// Audio session category (ambient, solo_ambient, playback, record, play_and_record, multi_route)
    #[arg(long, global = true)]
    pub category: Option<String>,

    /// Keep playing while the process is in the background
    #[arg(long, global = true)]
    pub background_audio: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play the given URLs or absolute paths in order, then exit
    Play {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Interactive control from stdin; events are printed as JSON lines
    Shell {
        /// Initial queue
        urls: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_requires_urls() {
        assert!(Args::try_parse_from(["player", "play"]).is_err());
        let args = Args::try_parse_from(["player", "play", "http://h/a.mp3", "/music/b.flac"])
            .unwrap();
        match args.cmd {
            Command::Play { urls } => assert_eq!(urls, vec!["http://h/a.mp3", "/music/b.flac"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let args = Args::try_parse_from([
            "player",
            "shell",
            "--item-duration-ms",
            "500",
            "--no-auto-advance",
            "--category",
            "playback",
        ])
        .unwrap();
        assert!(matches!(args.cmd, Command::Shell { ref urls } if urls.is_empty()));
        assert_eq!(args.item_duration_ms, Some(500));
        assert!(args.no_auto_advance);
        assert_eq!(args.category.as_deref(), Some("playback"));
        assert!(!args.background_audio);
    }
}

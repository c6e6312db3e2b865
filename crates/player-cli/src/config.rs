//! Configuration loading and parsing.
//!
//! Every setting is optional; command-line flags win over the file, the file wins
//! over built-in defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use playback_controller::{ControllerConfig, SilentEngineConfig};
use serde::Deserialize;

use crate::cli::Args;

/// Top-level player configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct PlayerConfig {
    pub controller: Option<ControllerSection>,
    pub engine: Option<EngineSection>,
    pub session: Option<SessionSection>,
}

/// Queue policy.
#[derive(Debug, Default, Deserialize)]
pub struct ControllerSection {
    /// Accepted URL schemes (default: file, http, https).
    pub schemes: Option<Vec<String>>,
    /// Allow the same identifier more than once (default: true).
    pub allow_duplicates: Option<bool>,
    /// Continue with the next item at the end of one (default: true).
    pub auto_advance: Option<bool>,
}

/// Simulated engine timing.
#[derive(Debug, Default, Deserialize)]
pub struct EngineSection {
    pub buffering_ms: Option<u64>,
    pub item_duration_ms: Option<u64>,
}

/// Process audio session.
#[derive(Debug, Default, Deserialize)]
pub struct SessionSection {
    pub category: Option<String>,
    pub background_audio: Option<bool>,
}

/// Settings after applying defaults and overrides.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub controller: ControllerConfig,
    pub engine: SilentEngineConfig,
    pub category: Option<String>,
    pub background_audio: bool,
}

impl PlayerConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        toml::from_str::<PlayerConfig>(&raw).with_context(|| format!("parse config {:?}", path))
    }

    /// Merge with command-line overrides.
    pub fn resolve(&self, args: &Args) -> ResolvedConfig {
        let controller_section = self.controller.as_ref();
        let engine_section = self.engine.as_ref();
        let session_section = self.session.as_ref();

        let mut controller = ControllerConfig::default();
        if let Some(schemes) = controller_section.and_then(|c| c.schemes.clone()) {
            controller.schemes = schemes
                .into_iter()
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(allow) = controller_section.and_then(|c| c.allow_duplicates) {
            controller.allow_duplicates = allow;
        }
        if let Some(auto) = controller_section.and_then(|c| c.auto_advance) {
            controller.auto_advance = auto;
        }
        if args.no_duplicates {
            controller.allow_duplicates = false;
        }
        if args.no_auto_advance {
            controller.auto_advance = false;
        }

        let mut engine = SilentEngineConfig::default();
        if let Some(ms) = args
            .buffering_ms
            .or_else(|| engine_section.and_then(|e| e.buffering_ms))
        {
            engine.buffering = Duration::from_millis(ms);
        }
        if let Some(ms) = args
            .item_duration_ms
            .or_else(|| engine_section.and_then(|e| e.item_duration_ms))
        {
            engine.item_duration = Duration::from_millis(ms);
        }

        let category = args
            .category
            .clone()
            .or_else(|| session_section.and_then(|s| s.category.clone()))
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let background_audio = args.background_audio
            || session_section
                .and_then(|s| s.background_audio)
                .unwrap_or(false);

        ResolvedConfig {
            controller,
            engine,
            category,
            background_audio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["player", "shell"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn empty_config_resolves_to_defaults() {
        let resolved = PlayerConfig::default().resolve(&args(&[]));
        assert_eq!(resolved.controller.schemes, vec!["file", "http", "https"]);
        assert!(resolved.controller.allow_duplicates);
        assert!(resolved.controller.auto_advance);
        assert_eq!(
            resolved.engine.item_duration,
            SilentEngineConfig::default().item_duration
        );
        assert_eq!(resolved.category, None);
        assert!(!resolved.background_audio);
    }

    #[test]
    fn file_sections_are_applied() {
        let cfg: PlayerConfig = toml::from_str(
            r#"
            [controller]
            schemes = ["HTTPS", " "]
            allow_duplicates = false

            [engine]
            buffering_ms = 20
            item_duration_ms = 1500

            [session]
            category = "play_and_record"
            background_audio = true
            "#,
        )
        .unwrap();
        let resolved = cfg.resolve(&args(&[]));
        assert_eq!(resolved.controller.schemes, vec!["https"]);
        assert!(!resolved.controller.allow_duplicates);
        assert!(resolved.controller.auto_advance);
        assert_eq!(resolved.engine.buffering, Duration::from_millis(20));
        assert_eq!(resolved.engine.item_duration, Duration::from_millis(1500));
        assert_eq!(resolved.category.as_deref(), Some("play_and_record"));
        assert!(resolved.background_audio);
    }

    #[test]
    fn flags_override_file() {
        let cfg: PlayerConfig = toml::from_str(
            r#"
            [engine]
            item_duration_ms = 1500

            [session]
            category = "ambient"
            "#,
        )
        .unwrap();
        let resolved = cfg.resolve(&args(&[
            "--item-duration-ms",
            "250",
            "--category",
            "playback",
            "--no-auto-advance",
        ]));
        assert_eq!(resolved.engine.item_duration, Duration::from_millis(250));
        assert_eq!(resolved.category.as_deref(), Some("playback"));
        assert!(!resolved.controller.auto_advance);
    }

    #[test]
    fn load_reports_path_on_parse_error() {
        let path = std::env::temp_dir().join(format!("player-cli-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[engine\nbuffering_ms = 1").unwrap();
        let err = PlayerConfig::load(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(format!("{err:#}").contains("parse config"));
    }
}

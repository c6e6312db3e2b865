use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse playback state of a controller.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing is playing. Initial state.
    #[default]
    Stopped,
    /// The engine confirmed playback of the current item.
    Playing,
    /// The current item is held at its position.
    Paused,
}

impl PlaybackState {
    /// Lowercase label used in logs and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason why the controller last went idle.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackEndReason {
    /// The queue ran out after the last item finished or was skipped.
    Eof,
    /// The engine reported a failure for the current item.
    Error,
    /// Playback was explicitly stopped by a command.
    Stopped,
}

/// Lifecycle notification emitted by a controller.
///
/// Mirrors the observer callbacks one-to-one so that front ends can consume
/// them as plain values (for example as JSON lines).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackEvent {
    WillStartPlayback { url: String },
    DidStartPlayback { url: String },
    WillPausePlayback { url: String },
    DidPausePlayback { url: String },
    DidFailPlayback { url: String, error: String },
    DidStartPlaying,
    DidPausePlaying,
    DidChangeState { state: PlaybackState },
}

/// Point-in-time view of a controller for API responses and the CLI.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControllerStatus {
    /// Current playback state.
    pub state: PlaybackState,
    /// Resource under the cursor, if any.
    pub current: Option<String>,
    /// Queue index of the cursor.
    pub cursor: Option<usize>,
    /// Whole queue in playback order.
    pub queue: Vec<String>,
    /// Duration of the current item in milliseconds, when the engine knows it.
    pub duration_ms: Option<u64>,
    /// `true` while a start request is waiting for engine confirmation.
    pub starting: bool,
    /// Why the controller last went idle.
    pub end_reason: Option<PlaybackEndReason>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_state_defaults_to_stopped() {
        assert_eq!(PlaybackState::default(), PlaybackState::Stopped);
        assert_eq!(PlaybackState::Paused.to_string(), "paused");
    }

    #[test]
    fn playback_event_is_tagged_by_kind() {
        let event = PlaybackEvent::DidChangeState {
            state: PlaybackState::Playing,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"kind":"did_change_state","state":"playing"}"#);

        let start = PlaybackEvent::WillStartPlayback {
            url: "file:///a.flac".to_string(),
        };
        let json = serde_json::to_value(&start).unwrap();
        assert_eq!(json["kind"], "will_start_playback");
        assert_eq!(json["url"], "file:///a.flac");
    }

    #[test]
    fn controller_status_parses_with_missing_optionals() {
        let raw = r#"{
            "state": "paused",
            "current": "http://host/a.mp3",
            "cursor": 0,
            "queue": ["http://host/a.mp3"],
            "duration_ms": null,
            "starting": false,
            "end_reason": null
        }"#;
        let status: ControllerStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(status.state, PlaybackState::Paused);
        assert_eq!(status.cursor, Some(0));
        assert!(status.end_reason.is_none());
    }
}

//! Process-wide audio session setup.
//!
//! A process has one audio session. Its category is chosen once; later requests for
//! the same category succeed, conflicting ones are refused and logged.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// How the process's audio interacts with other audio on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionCategory {
    /// Mixes with other audio, silenced by the ringer switch and screen lock.
    Ambient,
    /// Like `Ambient` but silences other audio.
    SoloAmbient,
    /// Primary playback, keeps running in the background when allowed.
    Playback,
    Record,
    PlayAndRecord,
    MultiRoute,
}

impl SessionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionCategory::Ambient => "ambient",
            SessionCategory::SoloAmbient => "solo_ambient",
            SessionCategory::Playback => "playback",
            SessionCategory::Record => "record",
            SessionCategory::PlayAndRecord => "play_and_record",
            SessionCategory::MultiRoute => "multi_route",
        }
    }

    /// Whether audio may keep playing while the process is in the background.
    pub fn allows_background(&self) -> bool {
        matches!(
            self,
            SessionCategory::Playback | SessionCategory::PlayAndRecord | SessionCategory::MultiRoute
        )
    }
}

impl fmt::Display for SessionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ambient" => Ok(SessionCategory::Ambient),
            "solo_ambient" => Ok(SessionCategory::SoloAmbient),
            "playback" => Ok(SessionCategory::Playback),
            "record" => Ok(SessionCategory::Record),
            "play_and_record" => Ok(SessionCategory::PlayAndRecord),
            "multi_route" => Ok(SessionCategory::MultiRoute),
            other => Err(format!("unknown session category: {other}")),
        }
    }
}

/// Audio session state. Use [`global`] for the process session.
#[derive(Debug)]
pub struct AudioSession {
    category: OnceLock<SessionCategory>,
    background: AtomicBool,
}

impl AudioSession {
    pub const fn new() -> Self {
        Self {
            category: OnceLock::new(),
            background: AtomicBool::new(false),
        }
    }

    /// Category chosen so far, if any.
    pub fn category(&self) -> Option<SessionCategory> {
        self.category.get().copied()
    }

    pub fn background_audio(&self) -> bool {
        self.background.load(Ordering::Relaxed)
    }

    /// Choose the session category by name.
    ///
    /// Returns `true` if the session now has this category. Unknown names and
    /// requests conflicting with an earlier choice return `false`.
    pub fn set_category(&self, name: &str) -> bool {
        let requested = match name.parse::<SessionCategory>() {
            Ok(category) => category,
            Err(e) => {
                tracing::warn!("{e}");
                return false;
            }
        };
        let active = *self.category.get_or_init(|| {
            tracing::info!(category = %requested, "audio session category set");
            requested
        });
        if active != requested {
            tracing::warn!(
                active = %active,
                requested = %requested,
                "audio session category already chosen"
            );
            return false;
        }
        true
    }

    /// Allow playback to continue in the background.
    ///
    /// Picks [`SessionCategory::Playback`] if no category was chosen yet. Fails when
    /// the chosen category does not allow background audio.
    pub fn enable_background_audio(&self) -> bool {
        let active = *self.category.get_or_init(|| SessionCategory::Playback);
        if !active.allows_background() {
            tracing::warn!(category = %active, "background audio not allowed for category");
            return false;
        }
        if !self.background.swap(true, Ordering::Relaxed) {
            tracing::info!(category = %active, "background audio enabled");
        }
        true
    }
}

impl Default for AudioSession {
    fn default() -> Self {
        Self::new()
    }
}

static SESSION: AudioSession = AudioSession::new();

/// The process audio session.
pub fn global() -> &'static AudioSession {
    &SESSION
}

/// [`AudioSession::set_category`] on the process session.
pub fn set_category(name: &str) -> bool {
    SESSION.set_category(name)
}

/// [`AudioSession::enable_background_audio`] on the process session.
pub fn enable_background_audio() -> bool {
    SESSION.enable_background_audio()
}

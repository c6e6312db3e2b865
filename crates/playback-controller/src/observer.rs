//! Observer contract and notification delivery.

use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender};
use playback_types::{PlaybackEvent, PlaybackState};

use crate::error::EngineError;
use crate::resource::ResourceId;

/// Listener for playback lifecycle notifications.
///
/// Every method has an empty default body; implement only the ones you care about.
/// The controller keeps a [`Weak`] reference, so registering an observer never
/// extends its lifetime.
///
/// Callbacks run on the thread that caused them: the caller's thread for `will*`
/// notifications and commands that complete synchronously, the controller's event
/// thread for anything confirmed by the engine. They are never invoked while the
/// controller is locked, so calling back into the controller is allowed.
///
/// For one operation, `will*` precedes `did*`, and `did_change_state` comes last.
pub trait PlaybackObserver: Send + Sync {
    fn will_start_playback(&self, _resource: &ResourceId) {}
    fn did_start_playback(&self, _resource: &ResourceId) {}
    fn will_pause_playback(&self, _resource: &ResourceId) {}
    fn did_pause_playback(&self, _resource: &ResourceId) {}
    /// The engine could not play `resource`; the controller is now stopped.
    fn did_fail_playback(&self, _resource: &ResourceId, _error: &EngineError) {}
    /// The controller entered [`PlaybackState::Playing`].
    fn did_start_playing(&self) {}
    /// The controller left [`PlaybackState::Playing`].
    fn did_pause_playing(&self) {}
    fn did_change_state(&self, _state: PlaybackState) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Notification {
    WillStart(ResourceId),
    DidStart(ResourceId),
    WillPause(ResourceId),
    DidPause(ResourceId),
    DidFail(ResourceId, EngineError),
    StartedPlaying,
    PausedPlaying,
    StateChanged(PlaybackState),
}

impl Notification {
    fn deliver(&self, observer: &dyn PlaybackObserver) {
        match self {
            Notification::WillStart(r) => observer.will_start_playback(r),
            Notification::DidStart(r) => observer.did_start_playback(r),
            Notification::WillPause(r) => observer.will_pause_playback(r),
            Notification::DidPause(r) => observer.did_pause_playback(r),
            Notification::DidFail(r, e) => observer.did_fail_playback(r, e),
            Notification::StartedPlaying => observer.did_start_playing(),
            Notification::PausedPlaying => observer.did_pause_playing(),
            Notification::StateChanged(state) => observer.did_change_state(*state),
        }
    }
}

/// Notifications gathered while the controller is locked, delivered after unlocking.
pub(crate) struct Outbox {
    observer: Option<Weak<dyn PlaybackObserver>>,
    notes: Vec<Notification>,
}

impl Outbox {
    pub fn new(observer: Option<Weak<dyn PlaybackObserver>>) -> Self {
        Self {
            observer,
            notes: Vec::new(),
        }
    }

    pub fn push(&mut self, note: Notification) {
        self.notes.push(note);
    }

    pub fn deliver(self) {
        if self.notes.is_empty() {
            return;
        }
        let Some(observer) = self.observer.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        for note in &self.notes {
            note.deliver(observer.as_ref());
        }
    }

    #[cfg(test)]
    pub fn notes(&self) -> &[Notification] {
        &self.notes
    }
}

/// Observer that forwards every notification as a [`PlaybackEvent`] over a channel.
///
/// Handy for front ends that consume events on their own thread, and for tests.
pub struct ChannelObserver {
    tx: Sender<PlaybackEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its event stream.
    pub fn new() -> (Arc<Self>, Receiver<PlaybackEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Arc::new(Self { tx }), rx)
    }

    fn send(&self, event: PlaybackEvent) {
        let _ = self.tx.send(event);
    }
}

impl PlaybackObserver for ChannelObserver {
    fn will_start_playback(&self, resource: &ResourceId) {
        self.send(PlaybackEvent::WillStartPlayback {
            url: resource.to_string(),
        });
    }

    fn did_start_playback(&self, resource: &ResourceId) {
        self.send(PlaybackEvent::DidStartPlayback {
            url: resource.to_string(),
        });
    }

    fn will_pause_playback(&self, resource: &ResourceId) {
        self.send(PlaybackEvent::WillPausePlayback {
            url: resource.to_string(),
        });
    }

    fn did_pause_playback(&self, resource: &ResourceId) {
        self.send(PlaybackEvent::DidPausePlayback {
            url: resource.to_string(),
        });
    }

    fn did_fail_playback(&self, resource: &ResourceId, error: &EngineError) {
        self.send(PlaybackEvent::DidFailPlayback {
            url: resource.to_string(),
            error: error.to_string(),
        });
    }

    fn did_start_playing(&self) {
        self.send(PlaybackEvent::DidStartPlaying);
    }

    fn did_pause_playing(&self) {
        self.send(PlaybackEvent::DidPausePlaying);
    }

    fn did_change_state(&self, state: PlaybackState) {
        self.send(PlaybackEvent::DidChangeState { state });
    }
}

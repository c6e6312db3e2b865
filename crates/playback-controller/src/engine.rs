//! Audio engine contract.
//!
//! The controller never decodes or renders audio itself. It drives an [`AudioEngine`]
//! and learns about asynchronous outcomes (buffering finished, end of item, host
//! interruption, failure) through the [`Completion`] handed over with every `load`.

use std::time::Duration;

use crossbeam_channel::Sender;

use crate::error::EngineError;
use crate::resource::ResourceId;

/// Backend that renders one resource at a time.
///
/// Calls are serialized by the controller. Implementations must not block on the
/// completion handle from inside these methods; report outcomes from their own
/// threads (or right away, the channel never blocks).
pub trait AudioEngine: Send {
    /// Prepare `resource`, replacing whatever was loaded before.
    fn load(&mut self, resource: &ResourceId, completion: Completion) -> Result<(), EngineError>;

    /// Start (or resume) the loaded resource.
    ///
    /// A fresh load confirms through [`Completion::started`]. Resuming a paused
    /// resource is confirmed by returning `Ok`.
    fn start(&mut self) -> Result<(), EngineError>;

    /// Hold the loaded resource at its current position.
    fn pause(&mut self) -> Result<(), EngineError>;

    /// Drop the loaded resource. Idempotent.
    fn stop(&mut self);

    /// Duration of the loaded resource, once known.
    fn current_duration(&self) -> Option<Duration>;
}

impl<E: AudioEngine + ?Sized> AudioEngine for Box<E> {
    fn load(&mut self, resource: &ResourceId, completion: Completion) -> Result<(), EngineError> {
        (**self).load(resource, completion)
    }

    fn start(&mut self) -> Result<(), EngineError> {
        (**self).start()
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        (**self).pause()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn current_duration(&self) -> Option<Duration> {
        (**self).current_duration()
    }
}

/// Asynchronous outcome reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EngineOutcome {
    Started,
    Finished,
    Interrupted,
    Failed(EngineError),
}

/// Outcome tagged with the load it belongs to.
#[derive(Debug)]
pub(crate) struct EngineSignal {
    pub id: u64,
    pub outcome: EngineOutcome,
}

/// Reporting handle for one `load` request.
///
/// Signals from a handle whose request has been superseded (another item loaded,
/// playback stopped) are ignored by the controller, so engines may report late
/// without coordinating with it.
#[derive(Clone, Debug)]
pub struct Completion {
    id: u64,
    tx: Sender<EngineSignal>,
}

impl Completion {
    pub(crate) fn new(id: u64, tx: Sender<EngineSignal>) -> Self {
        Self { id, tx }
    }

    /// Identifier of the load request this handle reports for.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Buffering finished and audio is playing.
    pub fn started(&self) {
        self.send(EngineOutcome::Started);
    }

    /// The resource played to its end.
    pub fn finished(&self) {
        self.send(EngineOutcome::Finished);
    }

    /// The host took the output away (for example an incoming call).
    pub fn interrupted(&self) {
        self.send(EngineOutcome::Interrupted);
    }

    /// The resource cannot be played.
    pub fn failed(&self, error: EngineError) {
        self.send(EngineOutcome::Failed(error));
    }

    fn send(&self, outcome: EngineOutcome) {
        let _ = self.tx.send(EngineSignal {
            id: self.id,
            outcome,
        });
    }
}

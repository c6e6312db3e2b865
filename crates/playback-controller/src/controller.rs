//! Queue-and-state-machine playback controller.
//!
//! Every operation runs in up to two locked phases:
//! 1. mutate the queue/state and gather the `will*` notification,
//! 2. after that notification was delivered, issue the engine command and gather
//!    the synchronous `did*` notifications.
//!
//! Each phase-2 command carries the generation it was prepared under. Any operation
//! that supersedes it bumps the generation, so stale commands and stale engine
//! signals are dropped instead of notifying about an item that is no longer current.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use playback_types::{ControllerStatus, PlaybackEndReason, PlaybackState};

use crate::config::ControllerConfig;
use crate::engine::{AudioEngine, Completion, EngineOutcome, EngineSignal};
use crate::error::{ControllerError, EngineError};
use crate::observer::{Notification, Outbox, PlaybackObserver};
use crate::queue::PlayQueue;
use crate::resource::{IntoResource, ResourceId};

/// Plays one resource at a time from an ordered queue.
///
/// Cheap to share: all operations take `&self` and are serialized internally.
/// Dropping the controller stops the engine and ends its event thread.
pub struct PlaybackController {
    core: Arc<Core>,
}

struct Core {
    inner: Mutex<Inner>,
}

struct Inner {
    config: ControllerConfig,
    engine: Box<dyn AudioEngine>,
    signal_tx: Sender<EngineSignal>,
    queue: PlayQueue,
    state: PlaybackState,
    /// Bumped whenever a prepared command or pending start becomes stale.
    generation: u64,
    /// Load request the engine currently holds.
    load_id: Option<u64>,
    /// Waiting for the engine to confirm a fresh load.
    starting: bool,
    /// The engine confirmed the current item and can resume it without reloading.
    confirmed: bool,
    end_reason: Option<PlaybackEndReason>,
    observer: Option<Weak<dyn PlaybackObserver>>,
}

/// Engine command prepared in phase 1 and committed in phase 2.
#[derive(Debug)]
enum Step {
    Load {
        generation: u64,
        resource: ResourceId,
    },
    Resume {
        generation: u64,
        resource: ResourceId,
    },
    Pause {
        generation: u64,
        resource: ResourceId,
        cancel_start: bool,
    },
}

impl Step {
    fn generation(&self) -> u64 {
        match self {
            Step::Load { generation, .. }
            | Step::Resume { generation, .. }
            | Step::Pause { generation, .. } => *generation,
        }
    }
}

impl PlaybackController {
    /// Empty controller with the default configuration.
    pub fn new<E: AudioEngine + 'static>(engine: E) -> Self {
        Self::with_config(engine, ControllerConfig::default())
    }

    /// Empty controller with a custom configuration.
    pub fn with_config<E: AudioEngine + 'static>(engine: E, config: ControllerConfig) -> Self {
        Self::build(Box::new(engine), config, PlayQueue::default())
    }

    /// Controller whose queue holds `resource`.
    pub fn with_resource<E, R>(engine: E, resource: R) -> Result<Self, ControllerError>
    where
        E: AudioEngine + 'static,
        R: IntoResource,
    {
        Self::from_parts(engine, ControllerConfig::default(), [resource])
    }

    /// Controller whose queue holds `resources` in order.
    pub fn with_resources<E, I>(engine: E, resources: I) -> Result<Self, ControllerError>
    where
        E: AudioEngine + 'static,
        I: IntoIterator,
        I::Item: IntoResource,
    {
        Self::from_parts(engine, ControllerConfig::default(), resources)
    }

    /// Controller with a custom configuration and an initial queue.
    ///
    /// Fails without constructing anything if any identifier is invalid.
    pub fn from_parts<E, I>(
        engine: E,
        config: ControllerConfig,
        resources: I,
    ) -> Result<Self, ControllerError>
    where
        E: AudioEngine + 'static,
        I: IntoIterator,
        I::Item: IntoResource,
    {
        let items = collect_resources(resources)?;
        config.check_batch(&[], &items)?;
        Ok(Self::build(Box::new(engine), config, PlayQueue::from_items(items)))
    }

    fn build(engine: Box<dyn AudioEngine>, config: ControllerConfig, queue: PlayQueue) -> Self {
        let (signal_tx, signal_rx) = crossbeam_channel::unbounded();
        let core = Arc::new(Core {
            inner: Mutex::new(Inner {
                config,
                engine,
                signal_tx,
                queue,
                state: PlaybackState::Stopped,
                generation: 0,
                load_id: None,
                starting: false,
                confirmed: false,
                end_reason: None,
                observer: None,
            }),
        });
        spawn_signal_pump(Arc::downgrade(&core), signal_rx);
        Self { core }
    }

    /// Register the observer. Only a weak reference is kept.
    pub fn set_observer<O: PlaybackObserver + 'static>(&self, observer: &Arc<O>) {
        let observer: Arc<dyn PlaybackObserver> = observer.clone();
        self.core.lock().observer = Some(Arc::downgrade(&observer));
    }

    pub fn clear_observer(&self) {
        self.core.lock().observer = None;
    }

    /// Replace the queue with `resource` and start it.
    pub fn play_url<R: IntoResource>(&self, resource: R) -> Result<(), ControllerError> {
        let resource = resource.into_resource()?;
        self.core.run(|inner, out| {
            inner.config.check(&resource)?;
            tracing::info!(url = %resource, "play url");
            inner.unload();
            inner.queue.replace_with(resource);
            Ok(((), inner.begin_load(out)))
        })
    }

    /// Start or resume the item under the cursor, selecting the first item if none is.
    ///
    /// No-op while already playing or starting.
    pub fn play(&self) -> Result<(), ControllerError> {
        self.core.run(|inner, out| Ok(((), inner.begin_play(out)?)))
    }

    /// Pause the current item. No-op unless playing or starting.
    pub fn pause(&self) -> Result<(), ControllerError> {
        self.core.run(|inner, out| Ok(((), inner.begin_pause(out))))
    }

    /// Pause when playing (or starting), play otherwise.
    pub fn toggle_playback(&self) -> Result<(), ControllerError> {
        self.core.run(|inner, out| {
            let step = if inner.state == PlaybackState::Playing || inner.starting {
                inner.begin_pause(out)
            } else {
                inner.begin_play(out)?
            };
            Ok(((), step))
        })
    }

    /// Append `resource` to the queue. Returns `false` and leaves the queue untouched
    /// if the identifier is rejected.
    pub fn enqueue<R: IntoResource>(&self, resource: R) -> bool {
        match self.try_enqueue(resource) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "enqueue rejected");
                false
            }
        }
    }

    /// Like [`enqueue`](Self::enqueue) but reports why an identifier was rejected.
    pub fn try_enqueue<R: IntoResource>(&self, resource: R) -> Result<(), ControllerError> {
        let resource = resource.into_resource()?;
        self.core.run(|inner, _| {
            inner
                .config
                .check_batch(inner.queue.items(), std::slice::from_ref(&resource))?;
            inner.queue.push(resource);
            Ok(((), None))
        })
    }

    /// Append all `resources`, or none of them if any is rejected.
    pub fn enqueue_all<I>(&self, resources: I) -> bool
    where
        I: IntoIterator,
        I::Item: IntoResource,
    {
        match self.try_enqueue_all(resources) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "batch enqueue rejected");
                false
            }
        }
    }

    /// Like [`enqueue_all`](Self::enqueue_all) but reports the first rejected identifier.
    pub fn try_enqueue_all<I>(&self, resources: I) -> Result<(), ControllerError>
    where
        I: IntoIterator,
        I::Item: IntoResource,
    {
        let batch = collect_resources(resources)?;
        self.core.run(|inner, _| {
            inner.config.check_batch(inner.queue.items(), &batch)?;
            inner.queue.extend(batch);
            Ok(((), None))
        })
    }

    /// Remove the first occurrence of `resource`.
    ///
    /// Removing the current item moves on exactly like [`advance_to_next`](Self::advance_to_next).
    /// Returns `false` when nothing matched.
    pub fn remove<R: IntoResource>(&self, resource: R) -> bool {
        let Ok(resource) = resource.into_resource() else {
            return false;
        };
        let result = self.core.run(|inner, out| {
            let Some(index) = inner.queue.position(&resource) else {
                return Ok((false, None));
            };
            if inner.queue.cursor() != Some(index) {
                inner.queue.remove_at(index);
                return Ok((true, None));
            }
            tracing::info!(url = %resource, "removing current item");
            inner.unload();
            inner.queue.remove_at(index);
            Ok((true, inner.start_current_or_stop(out)))
        });
        // Engine failures while starting the successor reach the observer; the
        // removal itself already happened.
        result.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "successor failed to start after removal");
            true
        })
    }

    /// Clear the queue and stop.
    pub fn remove_all(&self) {
        let _ = self.core.run(|inner, out| {
            tracing::info!(items = inner.queue.len(), "clearing queue");
            inner.unload();
            inner.queue.clear();
            if inner.state != PlaybackState::Stopped {
                inner.end_reason = Some(PlaybackEndReason::Stopped);
            }
            inner.transition(PlaybackState::Stopped, out);
            Ok(((), None))
        });
    }

    /// Start the item after the current one, or stop when there is none.
    pub fn advance_to_next(&self) -> Result<(), ControllerError> {
        self.core.run(|inner, out| Ok(((), inner.advance(out))))
    }

    /// Item under the cursor.
    pub fn current(&self) -> Option<ResourceId> {
        self.core.lock().queue.current().cloned()
    }

    /// Duration of the current item as reported by the engine.
    pub fn duration_of_current(&self) -> Option<Duration> {
        let inner = self.core.lock();
        inner.queue.current()?;
        inner.engine.current_duration()
    }

    /// Snapshot of the queue in playback order.
    pub fn queue(&self) -> Vec<ResourceId> {
        self.core.lock().queue.items().to_vec()
    }

    pub fn state(&self) -> PlaybackState {
        self.core.lock().state
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Serializable snapshot for front ends.
    pub fn status(&self) -> ControllerStatus {
        let inner = self.core.lock();
        let current = inner.queue.current();
        ControllerStatus {
            state: inner.state,
            current: current.map(ToString::to_string),
            cursor: inner.queue.cursor(),
            queue: inner.queue.items().iter().map(ToString::to_string).collect(),
            duration_ms: current
                .and(inner.engine.current_duration())
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            starting: inner.starting,
            end_reason: inner.end_reason,
        }
    }

    pub fn config(&self) -> ControllerConfig {
        self.core.lock().config.clone()
    }
}

fn collect_resources<I>(resources: I) -> Result<Vec<ResourceId>, ControllerError>
where
    I: IntoIterator,
    I::Item: IntoResource,
{
    resources
        .into_iter()
        .map(IntoResource::into_resource)
        .collect()
}

/// Apply engine signals on a dedicated thread until the controller is dropped.
fn spawn_signal_pump(core: Weak<Core>, rx: Receiver<EngineSignal>) {
    thread::spawn(move || {
        while let Ok(signal) = rx.recv() {
            let Some(core) = core.upgrade() else {
                break;
            };
            if let Err(e) = core.run(|inner, out| Ok(((), inner.on_signal(signal, out)))) {
                tracing::warn!("engine signal handling failed: {e}");
            }
        }
        tracing::debug!("playback signal pump exiting");
    });
}

impl Core {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run phase 1 under the lock, deliver its notifications, then commit the step.
    fn run<T>(
        &self,
        prepare: impl FnOnce(&mut Inner, &mut Outbox) -> Result<(T, Option<Step>), ControllerError>,
    ) -> Result<T, ControllerError> {
        let (value, step, out) = {
            let mut inner = self.lock();
            let mut out = Outbox::new(inner.observer.clone());
            let (value, step) = prepare(&mut *inner, &mut out)?;
            (value, step, out)
        };
        out.deliver();
        if let Some(step) = step {
            self.commit(step)?;
        }
        Ok(value)
    }

    fn commit(&self, step: Step) -> Result<(), ControllerError> {
        let (result, out) = {
            let mut inner = self.lock();
            let mut out = Outbox::new(inner.observer.clone());
            let result = inner.commit(step, &mut out);
            (result, out)
        };
        out.deliver();
        result
    }
}

impl Inner {
    fn next_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Drop the engine's item and invalidate anything in flight for it.
    fn unload(&mut self) {
        self.next_generation();
        if self.load_id.take().is_some() {
            self.engine.stop();
        }
        self.starting = false;
        self.confirmed = false;
    }

    fn transition(&mut self, next: PlaybackState, out: &mut Outbox) {
        let prev = self.state;
        if prev == next {
            return;
        }
        self.state = next;
        tracing::debug!(from = %prev, to = %next, "playback state changed");
        if prev == PlaybackState::Playing {
            out.push(Notification::PausedPlaying);
        }
        if next == PlaybackState::Playing {
            out.push(Notification::StartedPlaying);
        }
        out.push(Notification::StateChanged(next));
    }

    /// Announce and prepare a fresh load of the item under the cursor.
    fn begin_load(&mut self, out: &mut Outbox) -> Option<Step> {
        let resource = self.queue.current()?.clone();
        self.unload();
        self.starting = true;
        self.end_reason = None;
        out.push(Notification::WillStart(resource.clone()));
        Some(Step::Load {
            generation: self.generation,
            resource,
        })
    }

    fn begin_play(&mut self, out: &mut Outbox) -> Result<Option<Step>, ControllerError> {
        if self.queue.is_empty() {
            return Err(ControllerError::EmptyQueue);
        }
        if self.starting || self.state == PlaybackState::Playing {
            return Ok(None);
        }
        if self.queue.cursor().is_none() {
            self.queue.select(0);
        }
        if self.state == PlaybackState::Paused && self.confirmed {
            let Some(resource) = self.queue.current().cloned() else {
                return Ok(None);
            };
            let generation = self.next_generation();
            out.push(Notification::WillStart(resource.clone()));
            return Ok(Some(Step::Resume {
                generation,
                resource,
            }));
        }
        Ok(self.begin_load(out))
    }

    fn begin_pause(&mut self, out: &mut Outbox) -> Option<Step> {
        let resource = self.queue.current()?.clone();
        let cancel_start = self.starting;
        if !cancel_start && self.state != PlaybackState::Playing {
            return None;
        }
        self.starting = false;
        let generation = self.next_generation();
        out.push(Notification::WillPause(resource.clone()));
        Some(Step::Pause {
            generation,
            resource,
            cancel_start,
        })
    }

    /// Start the item now under the cursor, or go idle if the queue is exhausted.
    fn start_current_or_stop(&mut self, out: &mut Outbox) -> Option<Step> {
        if self.queue.current().is_some() {
            return self.begin_load(out);
        }
        tracing::info!("end of queue");
        self.queue.clear_cursor();
        self.end_reason = Some(PlaybackEndReason::Eof);
        self.transition(PlaybackState::Stopped, out);
        None
    }

    fn advance(&mut self, out: &mut Outbox) -> Option<Step> {
        self.queue.cursor()?;
        self.unload();
        self.queue.advance();
        self.start_current_or_stop(out)
    }

    fn fail(&mut self, error: EngineError, out: &mut Outbox) {
        let resource = self.queue.current().cloned();
        tracing::warn!(
            url = resource.as_ref().map(|r| r.as_str()).unwrap_or(""),
            error = %error,
            "playback failed"
        );
        self.unload();
        self.end_reason = Some(PlaybackEndReason::Error);
        if let Some(resource) = resource {
            out.push(Notification::DidFail(resource, error));
        }
        self.transition(PlaybackState::Stopped, out);
    }

    fn commit(&mut self, step: Step, out: &mut Outbox) -> Result<(), ControllerError> {
        if step.generation() != self.generation {
            tracing::debug!(
                step = step.generation(),
                current = self.generation,
                "dropping superseded engine command"
            );
            return Ok(());
        }
        match step {
            Step::Load {
                generation,
                resource,
            } => {
                self.load_id = Some(generation);
                let completion = Completion::new(generation, self.signal_tx.clone());
                let result = self
                    .engine
                    .load(&resource, completion)
                    .and_then(|()| self.engine.start());
                if let Err(e) = result {
                    self.fail(e.clone(), out);
                    return Err(e.into());
                }
                tracing::info!(url = %resource, generation, "start requested");
            }
            Step::Resume { resource, .. } => {
                if let Err(e) = self.engine.start() {
                    self.fail(e.clone(), out);
                    return Err(e.into());
                }
                tracing::info!(url = %resource, "resumed");
                out.push(Notification::DidStart(resource));
                self.transition(PlaybackState::Playing, out);
            }
            Step::Pause {
                resource,
                cancel_start,
                ..
            } => {
                if cancel_start {
                    if self.load_id.take().is_some() {
                        self.engine.stop();
                    }
                    self.confirmed = false;
                } else if let Err(e) = self.engine.pause() {
                    self.fail(e.clone(), out);
                    return Err(e.into());
                }
                tracing::info!(url = %resource, cancel_start, "paused");
                out.push(Notification::DidPause(resource));
                self.transition(PlaybackState::Paused, out);
            }
        }
        Ok(())
    }

    fn on_signal(&mut self, signal: EngineSignal, out: &mut Outbox) -> Option<Step> {
        if self.load_id != Some(signal.id) {
            tracing::debug!(id = signal.id, outcome = ?signal.outcome, "ignoring stale engine signal");
            return None;
        }
        match signal.outcome {
            EngineOutcome::Started => {
                if !self.starting {
                    return None;
                }
                let resource = self.queue.current()?.clone();
                self.starting = false;
                self.confirmed = true;
                tracing::info!(url = %resource, "playback started");
                out.push(Notification::DidStart(resource));
                self.transition(PlaybackState::Playing, out);
                None
            }
            EngineOutcome::Finished => {
                tracing::info!(id = signal.id, "item finished");
                if self.config.auto_advance {
                    return self.advance(out);
                }
                self.unload();
                self.end_reason = Some(PlaybackEndReason::Eof);
                self.transition(PlaybackState::Stopped, out);
                None
            }
            EngineOutcome::Interrupted => {
                if !self.starting && self.state != PlaybackState::Playing {
                    return None;
                }
                let resource = self.queue.current()?.clone();
                tracing::info!(url = %resource, "playback interrupted");
                if self.starting {
                    self.unload();
                } else {
                    self.next_generation();
                }
                out.push(Notification::WillPause(resource.clone()));
                out.push(Notification::DidPause(resource));
                self.transition(PlaybackState::Paused, out);
                None
            }
            EngineOutcome::Failed(error) => {
                self.fail(error, out);
                None
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.load_id.take().is_some() {
            self.engine.stop();
        }
    }
}

//! Real-time engine that renders nothing.
//!
//! Each started item runs on its own worker thread: it waits out a buffering delay,
//! confirms the start, advances a virtual clock while unpaused and reports the end of
//! the item once the configured duration has elapsed. Useful for headless runs and
//! for exercising the controller against real timing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::engine::{AudioEngine, Completion};
use crate::error::EngineError;
use crate::resource::ResourceId;

/// Timing parameters for [`SilentEngine`].
#[derive(Clone, Debug)]
pub struct SilentEngineConfig {
    /// Delay between `start` and the start confirmation.
    pub buffering: Duration,
    /// Nominal duration of every item.
    pub item_duration: Duration,
    /// Clock granularity of the worker thread.
    pub tick: Duration,
}

impl Default for SilentEngineConfig {
    fn default() -> Self {
        Self {
            buffering: Duration::from_millis(150),
            item_duration: Duration::from_secs(5),
            tick: Duration::from_millis(10),
        }
    }
}

struct Loaded {
    resource: ResourceId,
    completion: Completion,
}

struct SessionHandle {
    cancel: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    join: thread::JoinHandle<()>,
}

/// Engine that plays silence for a fixed duration per item.
///
/// `file://` resources that do not exist fail asynchronously with
/// [`EngineError::Unreachable`], like a real engine would after probing them.
pub struct SilentEngine {
    config: SilentEngineConfig,
    loaded: Option<Loaded>,
    session: Option<SessionHandle>,
    elapsed_ms: Arc<AtomicU64>,
}

impl SilentEngine {
    pub fn new(config: SilentEngineConfig) -> Self {
        Self {
            config,
            loaded: None,
            session: None,
            elapsed_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Virtual playback position of the loaded item.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::Relaxed))
    }

    /// Shared position counter, for observers that poll progress.
    pub fn elapsed_handle(&self) -> Arc<AtomicU64> {
        self.elapsed_ms.clone()
    }

    fn cancel_session(&mut self) {
        if let Some(sess) = self.session.take() {
            sess.cancel.store(true, Ordering::Relaxed);
            let _ = sess.join.join();
        }
    }
}

impl Default for SilentEngine {
    fn default() -> Self {
        Self::new(SilentEngineConfig::default())
    }
}

impl AudioEngine for SilentEngine {
    fn load(&mut self, resource: &ResourceId, completion: Completion) -> Result<(), EngineError> {
        self.cancel_session();
        self.elapsed_ms.store(0, Ordering::Relaxed);
        tracing::debug!(url = %resource, id = completion.id(), "silent engine load");
        self.loaded = Some(Loaded {
            resource: resource.clone(),
            completion,
        });
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        if let Some(sess) = self.session.as_ref() {
            sess.paused.store(false, Ordering::Relaxed);
            return Ok(());
        }
        let loaded = self
            .loaded
            .as_ref()
            .ok_or_else(|| EngineError::Output("nothing loaded".to_string()))?;

        let cancel = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            config: self.config.clone(),
            resource: loaded.resource.clone(),
            completion: loaded.completion.clone(),
            cancel: cancel.clone(),
            paused: paused.clone(),
            elapsed_ms: self.elapsed_ms.clone(),
        };
        let join = thread::spawn(move || worker.run());
        self.session = Some(SessionHandle {
            cancel,
            paused,
            join,
        });
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        if let Some(sess) = self.session.as_ref() {
            sess.paused.store(true, Ordering::Relaxed);
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.cancel_session();
        self.loaded = None;
        self.elapsed_ms.store(0, Ordering::Relaxed);
    }

    fn current_duration(&self) -> Option<Duration> {
        self.loaded.as_ref().map(|_| self.config.item_duration)
    }
}

impl Drop for SilentEngine {
    fn drop(&mut self) {
        self.cancel_session();
    }
}

struct Worker {
    config: SilentEngineConfig,
    resource: ResourceId,
    completion: Completion,
    cancel: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    elapsed_ms: Arc<AtomicU64>,
}

impl Worker {
    fn run(self) {
        let tick = self.config.tick.max(Duration::from_millis(1));
        if !self.sleep_unless_cancelled(self.config.buffering, tick) {
            return;
        }
        if let Some(path) = self.resource.to_file_path() {
            if !path.exists() {
                self.completion
                    .failed(EngineError::Unreachable(path.display().to_string()));
                return;
            }
        }
        self.completion.started();

        let total_ms = u64::try_from(self.config.item_duration.as_millis()).unwrap_or(u64::MAX);
        let tick_ms = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX);
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return;
            }
            if !self.paused.load(Ordering::Relaxed) {
                let elapsed = self.elapsed_ms.fetch_add(tick_ms, Ordering::Relaxed) + tick_ms;
                if elapsed >= total_ms {
                    self.elapsed_ms.store(total_ms, Ordering::Relaxed);
                    tracing::debug!(url = %self.resource, "silent engine reached end of item");
                    self.completion.finished();
                    return;
                }
            }
            thread::sleep(tick);
        }
    }

    /// Returns `false` if cancelled before `total` elapsed.
    fn sleep_unless_cancelled(&self, total: Duration, tick: Duration) -> bool {
        let mut slept = Duration::ZERO;
        while slept < total {
            if self.cancel.load(Ordering::Relaxed) {
                return false;
            }
            let step = tick.min(total - slept);
            thread::sleep(step);
            slept += step;
        }
        !self.cancel.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOutcome, EngineSignal};
    use crossbeam_channel::Receiver;

    fn fast_config() -> SilentEngineConfig {
        SilentEngineConfig {
            buffering: Duration::from_millis(5),
            item_duration: Duration::from_millis(40),
            tick: Duration::from_millis(2),
        }
    }

    fn completion(id: u64) -> (Completion, Receiver<EngineSignal>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Completion::new(id, tx), rx)
    }

    fn next_outcome(rx: &Receiver<EngineSignal>) -> EngineOutcome {
        rx.recv_timeout(Duration::from_secs(2))
            .expect("engine signal")
            .outcome
    }

    #[test]
    fn reports_start_then_finish() {
        let mut engine = SilentEngine::new(fast_config());
        let (done, rx) = completion(7);
        let id = ResourceId::parse("http://host/a.mp3").unwrap();
        engine.load(&id, done).unwrap();
        assert_eq!(engine.current_duration(), Some(Duration::from_millis(40)));
        engine.start().unwrap();

        let signal = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(signal.id, 7);
        assert_eq!(signal.outcome, EngineOutcome::Started);
        assert_eq!(next_outcome(&rx), EngineOutcome::Finished);
        assert_eq!(engine.elapsed(), Duration::from_millis(40));
    }

    #[test]
    fn stop_cancels_worker_silently() {
        let mut config = fast_config();
        config.buffering = Duration::from_millis(200);
        let mut engine = SilentEngine::new(config);
        let (done, rx) = completion(1);
        engine
            .load(&ResourceId::parse("http://host/a.mp3").unwrap(), done)
            .unwrap();
        engine.start().unwrap();
        engine.stop();
        assert!(engine.current_duration().is_none());
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn pause_holds_the_clock() {
        let mut config = fast_config();
        config.item_duration = Duration::from_secs(10);
        let mut engine = SilentEngine::new(config);
        let (done, rx) = completion(1);
        engine
            .load(&ResourceId::parse("http://host/a.mp3").unwrap(), done)
            .unwrap();
        engine.start().unwrap();
        assert_eq!(next_outcome(&rx), EngineOutcome::Started);

        engine.pause().unwrap();
        thread::sleep(Duration::from_millis(20));
        let held = engine.elapsed();
        thread::sleep(Duration::from_millis(40));
        assert_eq!(engine.elapsed(), held);

        engine.start().unwrap();
        thread::sleep(Duration::from_millis(40));
        assert!(engine.elapsed() > held);
    }

    #[cfg(unix)]
    #[test]
    fn missing_file_fails_asynchronously() {
        let mut engine = SilentEngine::new(fast_config());
        let (done, rx) = completion(3);
        let id = ResourceId::parse("/definitely/not/here/track.flac").unwrap();
        engine.load(&id, done).unwrap();
        engine.start().unwrap();
        match next_outcome(&rx) {
            EngineOutcome::Failed(EngineError::Unreachable(path)) => {
                assert!(path.ends_with("track.flac"))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn start_without_load_is_an_error() {
        let mut engine = SilentEngine::default();
        assert!(matches!(engine.start(), Err(EngineError::Output(_))));
        assert!(engine.pause().is_ok());
    }
}

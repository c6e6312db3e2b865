//! Player runtime.
//!
//! Builds a controller on top of the silent engine, wires the process audio
//! session and runs either the one-shot `play` mode or the interactive shell.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use playback_controller::{
    ChannelObserver, PlaybackController, PlaybackEndReason, PlaybackEvent, PlaybackState,
    SilentEngine, session,
};

use crate::cli::{Args, Command};
use crate::config::{PlayerConfig, ResolvedConfig};
use crate::shell::{self, Flow, ShellCommand};

/// Entry point shared by the binary.
pub fn run(args: Args) -> Result<()> {
    let file_cfg = match args.config.as_ref() {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::default(),
    };
    let resolved = file_cfg.resolve(&args);
    configure_session(&resolved)?;

    match args.cmd {
        Command::Play { urls } => run_play(&resolved, urls),
        Command::Shell { urls } => run_shell(&resolved, urls),
    }
}

fn configure_session(resolved: &ResolvedConfig) -> Result<()> {
    if let Some(category) = resolved.category.as_deref() {
        if !session::set_category(category) {
            return Err(anyhow::anyhow!("cannot use audio session category {category:?}"));
        }
    }
    if resolved.background_audio && !session::enable_background_audio() {
        tracing::warn!("background audio unavailable for this session category");
    }
    Ok(())
}

fn build_controller(
    resolved: &ResolvedConfig,
    urls: Vec<String>,
) -> Result<(Arc<PlaybackController>, Arc<ChannelObserver>, Receiver<PlaybackEvent>)> {
    let engine = SilentEngine::new(resolved.engine.clone());
    let controller = PlaybackController::from_parts(engine, resolved.controller.clone(), urls)
        .context("build initial queue")?;
    let controller = Arc::new(controller);
    let (observer, events) = ChannelObserver::new();
    controller.set_observer(&observer);

    let for_signal = controller.clone();
    let _ = ctrlc::set_handler(move || {
        for_signal.remove_all();
        std::process::exit(130);
    });

    Ok((controller, observer, events))
}

fn print_event(out: &mut impl Write, event: &PlaybackEvent) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string(event)?)?;
    out.flush()?;
    Ok(())
}

/// Play the queue to its end, skipping items the engine cannot play.
pub fn run_play(resolved: &ResolvedConfig, urls: Vec<String>) -> Result<()> {
    let (controller, _observer, events) = build_controller(resolved, urls)?;
    tracing::info!(items = controller.queue().len(), "playing queue");
    controller.play().context("start playback")?;

    let stdout = std::io::stdout();
    let mut failures = 0usize;
    for event in events.iter() {
        print_event(&mut stdout.lock(), &event)?;
        let settled = match event {
            PlaybackEvent::DidFailPlayback { .. } => {
                failures += 1;
                true
            }
            PlaybackEvent::DidChangeState { state } => state == PlaybackState::Stopped,
            _ => false,
        };
        if settled && !keep_playing(&controller)? {
            break;
        }
    }

    let status = controller.status();
    tracing::info!(failures, end_reason = ?status.end_reason, "playback finished");
    if failures > 0 && failures == status.queue.len() {
        return Err(anyhow::anyhow!("none of the {failures} items could be played"));
    }
    Ok(())
}

/// Whether play mode should keep waiting for events.
///
/// A start that fails before the engine confirms it leaves the controller
/// stopped without a state change, so this looks at the controller rather
/// than at the event that woke us.
fn keep_playing(controller: &PlaybackController) -> Result<bool> {
    let status = controller.status();
    if status.starting || status.state != PlaybackState::Stopped {
        return Ok(true);
    }
    skip_failed_item(controller)
}

/// After a failure, move on to the next item if there is one.
///
/// Returns `true` when playback continues.
fn skip_failed_item(controller: &PlaybackController) -> Result<bool> {
    let status = controller.status();
    if status.end_reason != Some(PlaybackEndReason::Error) {
        return Ok(false);
    }
    let has_next = status
        .cursor
        .is_some_and(|cursor| cursor + 1 < status.queue.len());
    if !has_next {
        return Ok(false);
    }
    controller.advance_to_next().context("skip failed item")?;
    Ok(true)
}

/// Interactive control from stdin until `quit` or end of input.
pub fn run_shell(resolved: &ResolvedConfig, urls: Vec<String>) -> Result<()> {
    let (controller, observer, events) = build_controller(resolved, urls)?;

    let printer = thread::spawn(move || {
        let stdout = std::io::stdout();
        for event in events.iter() {
            if let Err(e) = print_event(&mut stdout.lock(), &event) {
                tracing::warn!("event output failed: {e:#}");
                break;
            }
        }
    });

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("read command")?;
        let cmd = match ShellCommand::parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };
        let flow = shell::execute(&controller, cmd, &mut std::io::stdout().lock())?;
        if flow == Flow::Quit {
            break;
        }
    }

    controller.remove_all();
    controller.clear_observer();
    // The printer stops once the last event sender is gone.
    drop(observer);
    let _ = printer.join();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use playback_controller::{ControllerConfig, SilentEngineConfig};
    use std::time::Duration;

    fn resolved() -> ResolvedConfig {
        ResolvedConfig {
            controller: ControllerConfig::default(),
            engine: SilentEngineConfig {
                buffering: Duration::from_millis(2),
                item_duration: Duration::from_millis(20),
                tick: Duration::from_millis(2),
            },
            category: None,
            background_audio: false,
        }
    }

    #[test]
    fn build_controller_rejects_bad_queue() {
        let err = build_controller(&resolved(), vec!["relative/a.mp3".to_string()])
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("build initial queue"));
    }

    #[test]
    fn skip_only_after_failure_with_successor() {
        let controller = PlaybackController::with_resources(
            SilentEngine::new(resolved().engine),
            ["http://h/a.mp3", "http://h/b.mp3"],
        )
        .unwrap();
        assert!(!skip_failed_item(&controller).unwrap());
    }

    #[test]
    fn play_mode_runs_queue_to_completion() {
        let urls = vec!["http://h/a.mp3".to_string(), "http://h/b.mp3".to_string()];
        run_play(&resolved(), urls).unwrap();
    }

    fn play_in_background(urls: &[&str]) -> Result<()> {
        let urls: Vec<String> = urls.iter().map(|u| u.to_string()).collect();
        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let _ = tx.send(run_play(&resolved(), urls));
        });
        rx.recv_timeout(Duration::from_secs(5))
            .expect("play mode did not finish")
    }

    #[cfg(unix)]
    #[test]
    fn play_mode_skips_item_that_fails_before_starting() {
        play_in_background(&["/no/such/dir/missing.flac", "http://h/b.mp3"]).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn play_mode_fails_when_nothing_plays() {
        let err = play_in_background(&["/no/such/dir/a.flac", "/no/such/dir/b.flac"])
            .err()
            .unwrap();
        assert!(err.to_string().contains("none of the 2 items"));
    }
}

//! Interactive command language for `player shell`.

use std::io::Write;

use anyhow::Result;
use playback_controller::PlaybackController;

pub const HELP: &str = "\
commands:
  play [url]       start the queue, or replace it with url and play
  pause            pause the current item
  toggle           pause when playing, play otherwise
  next             skip to the next item
  enqueue <url..>  append items (all or nothing)
  remove <url>     remove the first matching item
  clear            empty the queue and stop
  status           print controller status as JSON
  queue            list the queue
  quit             exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Play(Option<String>),
    Pause,
    Toggle,
    Next,
    Enqueue(Vec<String>),
    Remove(String),
    Clear,
    Status,
    Queue,
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<String> = words.map(str::to_string).collect();
        let no_args = |cmd: ShellCommand| bare(verb, &rest, cmd);
        match verb.to_ascii_lowercase().as_str() {
            "play" => match rest.as_slice() {
                [] => Ok(Some(ShellCommand::Play(None))),
                [url] => Ok(Some(ShellCommand::Play(Some(url.clone())))),
                _ => Err("play takes at most one url".to_string()),
            },
            "pause" => no_args(ShellCommand::Pause),
            "toggle" => no_args(ShellCommand::Toggle),
            "next" | "skip" => no_args(ShellCommand::Next),
            "enqueue" | "add" => {
                if rest.is_empty() {
                    Err("enqueue needs at least one url".to_string())
                } else {
                    Ok(Some(ShellCommand::Enqueue(rest.clone())))
                }
            }
            "remove" | "rm" => match rest.as_slice() {
                [url] => Ok(Some(ShellCommand::Remove(url.clone()))),
                _ => Err("remove takes exactly one url".to_string()),
            },
            "clear" => no_args(ShellCommand::Clear),
            "status" => no_args(ShellCommand::Status),
            "queue" | "ls" => no_args(ShellCommand::Queue),
            "help" | "?" => no_args(ShellCommand::Help),
            "quit" | "exit" => no_args(ShellCommand::Quit),
            other => Err(format!("unknown command {other:?} (try help)")),
        }
    }
}

fn bare(verb: &str, rest: &[String], cmd: ShellCommand) -> Result<Option<ShellCommand>, String> {
    if rest.is_empty() {
        Ok(Some(cmd))
    } else {
        Err(format!("{verb} takes no arguments"))
    }
}

/// Whether the shell keeps reading input.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run one command against `controller`, writing replies to `out`.
///
/// Controller errors are reported to `out`; only I/O failures are returned.
pub fn execute(
    controller: &PlaybackController,
    cmd: ShellCommand,
    out: &mut impl Write,
) -> Result<Flow> {
    let outcome = match cmd {
        ShellCommand::Play(Some(url)) => controller.play_url(url.as_str()),
        ShellCommand::Play(None) => controller.play(),
        ShellCommand::Pause => controller.pause(),
        ShellCommand::Toggle => controller.toggle_playback(),
        ShellCommand::Next => controller.advance_to_next(),
        ShellCommand::Enqueue(urls) => controller.try_enqueue_all(urls),
        ShellCommand::Remove(url) => {
            if !controller.remove(url.as_str()) {
                writeln!(out, "not queued: {url}")?;
            }
            Ok(())
        }
        ShellCommand::Clear => {
            controller.remove_all();
            Ok(())
        }
        ShellCommand::Status => {
            writeln!(out, "{}", serde_json::to_string(&controller.status())?)?;
            Ok(())
        }
        ShellCommand::Queue => {
            write_queue(controller, out)?;
            Ok(())
        }
        ShellCommand::Help => {
            writeln!(out, "{HELP}")?;
            Ok(())
        }
        ShellCommand::Quit => return Ok(Flow::Quit),
    };
    if let Err(e) = outcome {
        writeln!(out, "error: {e}")?;
    }
    Ok(Flow::Continue)
}

fn write_queue(controller: &PlaybackController, out: &mut impl Write) -> std::io::Result<()> {
    let status = controller.status();
    if status.queue.is_empty() {
        return writeln!(out, "(empty)");
    }
    for (i, url) in status.queue.iter().enumerate() {
        let marker = if status.cursor == Some(i) { '>' } else { ' ' };
        writeln!(out, "{marker} {i:>3} {url}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use playback_controller::{SilentEngine, SilentEngineConfig};
    use std::time::Duration;

    fn quiet_controller(urls: &[&str]) -> PlaybackController {
        let engine = SilentEngine::new(SilentEngineConfig {
            buffering: Duration::from_secs(60),
            ..SilentEngineConfig::default()
        });
        PlaybackController::with_resources(engine, urls.iter().copied()).unwrap()
    }

    fn run(controller: &PlaybackController, line: &str) -> (Flow, String) {
        let cmd = ShellCommand::parse(line).unwrap().unwrap();
        let mut out = Vec::new();
        let flow = execute(controller, cmd, &mut out).unwrap();
        (flow, String::from_utf8(out).unwrap())
    }

    #[test]
    fn parses_commands_and_aliases() {
        assert_eq!(ShellCommand::parse("   "), Ok(None));
        assert_eq!(
            ShellCommand::parse("PLAY http://h/a.mp3"),
            Ok(Some(ShellCommand::Play(Some("http://h/a.mp3".to_string()))))
        );
        assert_eq!(ShellCommand::parse("skip"), Ok(Some(ShellCommand::Next)));
        assert_eq!(
            ShellCommand::parse("add a b"),
            Ok(Some(ShellCommand::Enqueue(vec![
                "a".to_string(),
                "b".to_string()
            ])))
        );
        assert_eq!(ShellCommand::parse("exit"), Ok(Some(ShellCommand::Quit)));
    }

    #[test]
    fn rejects_bad_arity_and_unknown_verbs() {
        assert!(ShellCommand::parse("pause now").is_err());
        assert!(ShellCommand::parse("enqueue").is_err());
        assert!(ShellCommand::parse("remove a b").is_err());
        assert!(ShellCommand::parse("play a b").is_err());
        assert!(ShellCommand::parse("rewind").is_err());
    }

    #[test]
    fn queue_listing_marks_cursor() {
        let controller = quiet_controller(&["http://h/a.mp3", "http://h/b.mp3"]);
        let (_, listing) = run(&controller, "queue");
        assert_eq!(listing, "    0 http://h/a.mp3\n    1 http://h/b.mp3\n");

        run(&controller, "play");
        let (_, listing) = run(&controller, "queue");
        assert!(listing.starts_with(">   0 http://h/a.mp3"));
    }

    #[test]
    fn errors_are_reported_not_returned() {
        let controller = quiet_controller(&[]);
        let (flow, reply) = run(&controller, "play");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(reply, "error: queue is empty\n");

        let (_, reply) = run(&controller, "enqueue http://h/a.mp3 nope");
        assert!(reply.starts_with("error: invalid resource \"nope\""));
        assert!(controller.queue().is_empty());

        let (_, reply) = run(&controller, "remove http://h/x.mp3");
        assert_eq!(reply, "not queued: http://h/x.mp3\n");
    }

    #[test]
    fn status_is_json_and_quit_stops() {
        let controller = quiet_controller(&["http://h/a.mp3"]);
        let (_, reply) = run(&controller, "status");
        let status: playback_types::ControllerStatus = serde_json::from_str(reply.trim()).unwrap();
        assert_eq!(status.queue, vec!["http://h/a.mp3"]);
        assert_eq!(run(&controller, "quit").0, Flow::Quit);
        assert_eq!(run(&controller, "clear").1, "");
        assert!(controller.queue().is_empty());
    }
}

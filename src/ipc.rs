use std::io::BufRead;
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::time::Duration;

use futures::channel::mpsc;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::app::Message;
use crate::renderer::RendererMessage;

pub(crate) fn socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("rin-hud.sock")
}

/// Map one control-socket line to a message. Unknown or malformed commands
/// yield `None`.
pub(crate) fn parse_command(line: &str) -> Option<Message> {
    match line.trim() {
        "toggle" => Some(Message::ToggleVisibility),
        "quit" => Some(Message::Quit),
        "capture" => Some(Message::Capture),
        "status" => Some(Message::LogStatus),
        cmd if cmd.starts_with("say ") => {
            let text = cmd[4..].trim();
            if text.is_empty() {
                None
            } else {
                Some(Message::Renderer(RendererMessage::Inject(text.to_string())))
            }
        }
        _ => None,
    }
}

pub(crate) fn socket_listener() -> impl futures::Stream<Item = Message> {
    let (tx, rx) = mpsc::unbounded();
    std::thread::spawn(move || {
        let path = socket_path();
        let _ = std::fs::remove_file(&path);
        let listener = match UnixListener::bind(&path) {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to bind control socket");
                return;
            }
        };
        tracing::info!(path = %path.display(), "listening");
        for stream in listener.incoming().flatten() {
            let mut buf = String::new();
            if std::io::BufReader::new(stream).read_line(&mut buf).is_err() {
                continue;
            }
            match parse_command(&buf) {
                Some(msg) => {
                    if tx.unbounded_send(msg).is_err() {
                        break;
                    }
                }
                None => tracing::warn!(command = ?buf.trim(), "unknown command"),
            }
        }
    });
    rx
}

/// Signals that end the host the same way the `quit` command does.
const SHUTDOWN_SIGNALS: [i32; 3] = [SIGINT, SIGTERM, SIGHUP];

/// Turn each of `signals` into a `Message::Quit`. Handlers are installed
/// before this returns; the default terminate action no longer applies.
fn quit_on_signals(signals: &[i32]) -> mpsc::UnboundedReceiver<Message> {
    let (tx, rx) = mpsc::unbounded();
    let mut signals = match Signals::new(signals) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to install signal handlers");
            return rx;
        }
    };
    std::thread::spawn(move || {
        for signal in signals.forever() {
            tracing::info!(signal, "shutdown signal received");
            if tx.unbounded_send(Message::Quit).is_err() {
                break;
            }
        }
    });
    rx
}

pub(crate) fn shutdown_signal_stream() -> impl futures::Stream<Item = Message> {
    quit_on_signals(&SHUTDOWN_SIGNALS)
}

fn every(period: Duration, make: fn() -> Message) -> mpsc::UnboundedReceiver<Message> {
    let (tx, rx) = mpsc::unbounded();
    std::thread::spawn(move || loop {
        std::thread::sleep(period);
        if tx.unbounded_send(make()).is_err() {
            break;
        }
    });
    rx
}

pub(crate) fn tick_stream(ms: &u64) -> mpsc::UnboundedReceiver<Message> {
    every(Duration::from_millis(*ms), || Message::Renderer(RendererMessage::Tick))
}

pub(crate) fn health_poll_stream(secs: &u64) -> mpsc::UnboundedReceiver<Message> {
    every(Duration::from_secs((*secs).max(1)), || Message::HealthPoll)
}

pub(crate) fn idle_poll_stream(secs: &u64) -> mpsc::UnboundedReceiver<Message> {
    every(Duration::from_secs((*secs).max(1)), || {
        Message::Renderer(RendererMessage::PollIdle)
    })
}

pub(crate) fn theme_refresh_stream() -> impl futures::Stream<Item = Message> {
    every(Duration::from_secs(5), || Message::ThemeRefresh)
}

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process;

fn socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("rin-hud.sock")
}

/// Check a command line before it goes over the socket.
fn validate(cmd: &str) -> Result<(), String> {
    match cmd {
        "toggle" | "quit" | "capture" | "status" => Ok(()),
        "say" => Err("say needs some text".to_string()),
        _ if cmd.starts_with("say ") => {
            if cmd[4..].contains('\n') {
                Err("say text must be a single line".to_string())
            } else {
                Ok(())
            }
        }
        _ => Err(format!("unknown command: {cmd}")),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
        process::exit(1);
    }

    let cmd = args.join(" ");
    if let Err(e) = validate(cmd.trim()) {
        eprintln!("{e}");
        usage();
        process::exit(1);
    }

    let path = socket_path();
    let mut stream = match UnixStream::connect(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("rin-hud not running ({}): {e}", path.display());
            process::exit(1);
        }
    };

    if let Err(e) = writeln!(stream, "{}", cmd.trim()) {
        eprintln!("failed to send command: {e}");
        process::exit(1);
    }
}

fn usage() {
    eprintln!("usage: rin-hud-ctl <command>");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  toggle       show or hide the companion window");
    eprintln!("  quit         close the window and stop an owned backend");
    eprintln!("  say <text>   send <text> as if typed into the chat box");
    eprintln!("  capture      ask the backend what window is active");
    eprintln!("  status       log backend, window and chat state");
}

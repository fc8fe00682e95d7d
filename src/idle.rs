use std::process::{Command, Stdio};

/// `xprintidle` prints milliseconds since the last input event.
fn parse_xprintidle(stdout: &str) -> Option<u64> {
    stdout.trim().parse::<u64>().ok().map(|ms| ms / 1000)
}

/// Seconds since the user last touched keyboard or mouse.
///
/// Asks `xprintidle` first. Without it (pure Wayland sessions mostly), falls
/// back to `fallback_secs`, the time since the last renderer activity.
pub(crate) fn system_idle_seconds(fallback_secs: u64) -> u64 {
    let output = Command::new("xprintidle")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();
    match output {
        Ok(out) if out.status.success() => {
            match parse_xprintidle(&String::from_utf8_lossy(&out.stdout)) {
                Some(secs) => secs,
                None => {
                    tracing::debug!("xprintidle output unparseable, using activity clock");
                    fallback_secs
                }
            }
        }
        Ok(out) => {
            tracing::debug!(status = %out.status, "xprintidle failed, using activity clock");
            fallback_secs
        }
        Err(_) => fallback_secs,
    }
}

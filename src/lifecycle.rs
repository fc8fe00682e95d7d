//! Backend process ownership.
//!
//! The controller either finds the backend already running (externally
//! managed, never signalled) or spawns it and owns the child. Teardown
//! force-kills owned children and reaps them; errors there are logged and
//! swallowed.

use std::fmt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::backend::StatusReport;
use crate::config::BackendConfig;
use crate::error::LifecycleError;

/// A child process this host started and must clean up.
pub struct OwnedProcess {
    command: String,
    child: Child,
}

impl OwnedProcess {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Exit status once the child has ended on its own.
    fn exited(&mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(pid = self.child.id(), error = %e, "backend status check failed");
                None
            }
        }
    }

    /// SIGKILL and reap. An already-exited child is not an error.
    fn terminate(&mut self) {
        let pid = self.child.id();
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(pid, %status, command = %self.command, "backend already exited");
                return;
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(pid, error = %e, "backend status check failed"),
        }
        if let Err(e) = self.child.kill() {
            tracing::debug!(pid, error = %e, "backend kill failed (ignored)");
        }
        match self.child.wait() {
            Ok(status) => tracing::info!(pid, %status, "backend terminated"),
            Err(e) => tracing::debug!(pid, error = %e, "backend reap failed (ignored)"),
        }
    }
}

/// Who owns the backend process.
pub enum BackendProcess {
    /// Started by this host; killed on shutdown.
    Spawned(OwnedProcess),
    /// Already running when the host started; never signalled.
    External,
}

/// Backend availability as shown in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    /// Spawned, waiting for the first healthy poll.
    Starting,
    Online,
    /// Degraded mode. Chat still works via the echo transport.
    Offline(String),
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => f.write_str("starting"),
            Self::Online => f.write_str("online"),
            Self::Offline(reason) => write!(f, "offline ({reason})"),
        }
    }
}

/// Failed health polls tolerated while a spawned backend is starting.
pub const STARTING_GRACE_POLLS: u32 = 6;

pub struct ProcessLifecycleController {
    handles: Vec<BackendProcess>,
    status: BackendStatus,
    failed_polls: u32,
}

/// Start `command` through `sh -c "exec ..."` so the shell is replaced and
/// the recorded pid is the backend itself.
pub fn spawn_backend(command: &str, working_dir: Option<&Path>) -> Result<OwnedProcess, LifecycleError> {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", &format!("exec {command}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit());
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }
    let child = cmd.spawn().map_err(|source| LifecycleError::Spawn {
        command: command.to_string(),
        source,
    })?;
    Ok(OwnedProcess {
        command: command.to_string(),
        child,
    })
}

impl ProcessLifecycleController {
    /// Check the backend; spawn it if it is down and a command is configured.
    /// A failed spawn leaves the host in offline mode. Nothing is retried.
    pub fn start(config: &BackendConfig, check_health: impl FnOnce() -> StatusReport) -> Self {
        let report = check_health();
        if report.is_ok() {
            tracing::info!(url = %config.base_url, "backend already running (external)");
            return Self {
                handles: vec![BackendProcess::External],
                status: BackendStatus::Online,
                failed_polls: 0,
            };
        }

        let spawned = config
            .command
            .as_deref()
            .ok_or(LifecycleError::NotConfigured)
            .and_then(|command| spawn_backend(command, config.working_dir.as_deref()));

        match spawned {
            Ok(process) => {
                tracing::info!(pid = process.pid(), command = %process.command, "backend spawned");
                Self {
                    handles: vec![BackendProcess::Spawned(process)],
                    status: BackendStatus::Starting,
                    failed_polls: 0,
                }
            }
            Err(e) => {
                let reason = match &e {
                    LifecycleError::NotConfigured => report
                        .error
                        .unwrap_or_else(|| format!("status {}", report.status)),
                    other => other.to_string(),
                };
                tracing::warn!(error = %e, "backend offline, continuing in degraded mode");
                Self {
                    handles: Vec::new(),
                    status: BackendStatus::Offline(reason),
                    failed_polls: 0,
                }
            }
        }
    }

    pub fn status(&self) -> &BackendStatus {
        &self.status
    }

    /// Fold a periodic health poll into the displayed status.
    ///
    /// While `Starting`, a failed poll only turns into `Offline` once the
    /// spawned child has exited or [`STARTING_GRACE_POLLS`] polls in a row
    /// have failed.
    pub fn observe_health(&mut self, report: &StatusReport) {
        let next = if report.is_ok() {
            self.failed_polls = 0;
            BackendStatus::Online
        } else {
            self.failed_polls = self.failed_polls.saturating_add(1);
            let reason = || {
                report
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("status {}", report.status))
            };
            if let Some(status) = self.exited_child() {
                BackendStatus::Offline(format!("backend exited: {status}"))
            } else if self.status == BackendStatus::Starting
                && self.failed_polls < STARTING_GRACE_POLLS
            {
                BackendStatus::Starting
            } else {
                BackendStatus::Offline(reason())
            }
        };
        if next != self.status {
            tracing::info!(failed_polls = self.failed_polls, "backend {} -> {}", self.status, next);
            self.status = next;
        }
    }

    /// First owned child that is no longer running.
    fn exited_child(&mut self) -> Option<ExitStatus> {
        self.handles.iter_mut().find_map(|h| match h {
            BackendProcess::Spawned(p) => p.exited(),
            BackendProcess::External => None,
        })
    }

    pub fn owned_pids(&self) -> Vec<u32> {
        self.handles
            .iter()
            .filter_map(|h| match h {
                BackendProcess::Spawned(p) => Some(p.pid()),
                BackendProcess::External => None,
            })
            .collect()
    }

    /// Kill every owned child. Returns how many were signalled; a second
    /// call finds nothing left and returns 0.
    pub fn shutdown(&mut self) -> usize {
        let mut signalled = 0;
        for handle in self.handles.drain(..) {
            match handle {
                BackendProcess::Spawned(mut process) => {
                    process.terminate();
                    signalled += 1;
                }
                BackendProcess::External => {}
            }
        }
        signalled
    }
}

impl Drop for ProcessLifecycleController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;

    fn down() -> StatusReport {
        StatusReport::error(&BackendError::Unreachable("connection refused".into()))
    }

    fn up() -> StatusReport {
        StatusReport {
            status: "ok".into(),
            error: None,
        }
    }

    fn with_command(command: Option<&str>) -> BackendConfig {
        BackendConfig {
            command: command.map(String::from),
            ..BackendConfig::default()
        }
    }

    fn pid_alive(pid: u32) -> bool {
        Path::new(&format!("/proc/{pid}")).exists()
    }

    #[test]
    fn running_backend_is_external_and_never_signalled() {
        let mut ctl = ProcessLifecycleController::start(&with_command(Some("sleep 30")), up);
        assert_eq!(ctl.status(), &BackendStatus::Online);
        assert!(ctl.owned_pids().is_empty());
        assert_eq!(ctl.shutdown(), 0);
    }

    #[test]
    fn down_without_command_is_offline() {
        let ctl = ProcessLifecycleController::start(&with_command(None), down);
        match ctl.status() {
            BackendStatus::Offline(reason) => assert!(reason.contains("connection refused")),
            other => panic!("expected offline, got {other:?}"),
        }
        assert!(ctl.owned_pids().is_empty());
    }

    #[test]
    fn spawned_backend_is_killed_once() {
        let mut ctl = ProcessLifecycleController::start(&with_command(Some("sleep 30")), down);
        assert_eq!(ctl.status(), &BackendStatus::Starting);
        let pids = ctl.owned_pids();
        assert_eq!(pids.len(), 1);
        assert!(pid_alive(pids[0]));

        assert_eq!(ctl.shutdown(), 1);
        assert!(!pid_alive(pids[0]));
        assert_eq!(ctl.shutdown(), 0);
    }

    #[test]
    fn already_exited_backend_is_not_an_error() {
        let mut ctl = ProcessLifecycleController::start(&with_command(Some("true")), down);
        std::thread::sleep(std::time::Duration::from_millis(200));
        assert_eq!(ctl.shutdown(), 1);
        assert_eq!(ctl.shutdown(), 0);
    }

    #[test]
    fn bad_working_dir_degrades_to_offline() {
        let config = BackendConfig {
            command: Some("sleep 30".into()),
            working_dir: Some("/definitely/not/here".into()),
            ..BackendConfig::default()
        };
        let ctl = ProcessLifecycleController::start(&config, down);
        match ctl.status() {
            BackendStatus::Offline(reason) => assert!(reason.contains("failed to spawn")),
            other => panic!("expected offline, got {other:?}"),
        }
    }

    #[test]
    fn health_transitions() {
        let mut ctl = ProcessLifecycleController::start(&with_command(Some("sleep 30")), down);
        ctl.observe_health(&down());
        assert_eq!(ctl.status(), &BackendStatus::Starting);
        ctl.observe_health(&up());
        assert_eq!(ctl.status(), &BackendStatus::Online);
        ctl.observe_health(&down());
        assert!(matches!(ctl.status(), BackendStatus::Offline(_)));
        ctl.shutdown();
    }

    #[test]
    fn missing_binary_goes_offline() {
        let mut ctl = ProcessLifecycleController::start(
            &with_command(Some("definitely-not-a-binary-xyz")),
            down,
        );
        assert_eq!(ctl.status(), &BackendStatus::Starting);
        std::thread::sleep(std::time::Duration::from_millis(300));
        ctl.observe_health(&down());
        match ctl.status() {
            BackendStatus::Offline(reason) => assert!(reason.contains("exited"), "{reason}"),
            other => panic!("expected offline, got {other:?}"),
        }
        // reaped child still counts once
        assert_eq!(ctl.shutdown(), 1);
    }

    #[test]
    fn silent_backend_gives_up_starting() {
        let mut ctl = ProcessLifecycleController::start(&with_command(Some("sleep 30")), down);
        for _ in 1..STARTING_GRACE_POLLS {
            ctl.observe_health(&down());
            assert_eq!(ctl.status(), &BackendStatus::Starting);
        }
        ctl.observe_health(&down());
        match ctl.status() {
            BackendStatus::Offline(reason) => assert!(reason.contains("connection refused")),
            other => panic!("expected offline, got {other:?}"),
        }
        // a late healthy answer still brings it online
        ctl.observe_health(&up());
        assert_eq!(ctl.status(), &BackendStatus::Online);
        ctl.shutdown();
    }

    #[test]
    fn drop_kills_owned_children() {
        let ctl = ProcessLifecycleController::start(&with_command(Some("sleep 30")), down);
        let pid = ctl.owned_pids()[0];
        drop(ctl);
        assert!(!pid_alive(pid));
    }
}

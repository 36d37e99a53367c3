//! Supervisor invocation.
//!
//! The daemon is never forked by this tool. Instead the external supervisor
//! is run to completion: it backgrounds the daemon, records the daemon's pid
//! in the marker path it is given, and exits.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use hendrix_config::Config;
use tracing::{debug, warn};

use super::LIFECYCLE_TARGET;
use super::error::{LifecycleError, SpawnFailure};
use crate::registry::ServiceIdentity;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Everything the supervisor needs to launch one instance.
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub identity: &'a ServiceIdentity,
    pub entry_point: &'a str,
    pub marker: &'a Path,
}

/// Seam over the external process-supervision binary.
pub trait Launcher {
    /// Runs the supervisor for `request`, returning once it has exited.
    fn launch(&self, request: LaunchRequest<'_>) -> Result<(), LifecycleError>;
}

/// Launcher that shells out to the configured supervisor binary.
#[derive(Debug, Clone)]
pub struct SupervisorLauncher {
    supervisor: OsString,
    daemon: OsString,
    timeout: Duration,
}

impl SupervisorLauncher {
    /// Builds a launcher from explicit binaries and timeout.
    pub fn new(supervisor: impl Into<OsString>, daemon: impl Into<OsString>, timeout: Duration) -> Self {
        Self {
            supervisor: supervisor.into(),
            daemon: daemon.into(),
            timeout,
        }
    }

    /// Builds a launcher from the shared configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.supervisor_binary(),
            config.daemon_binary(),
            config.spawn_timeout(),
        )
    }

    /// Assembles `<supervisor> --pidfile <marker> <daemon> --port .. --settings .. --wsgi ..`.
    pub(super) fn command(&self, request: LaunchRequest<'_>) -> Command {
        let mut command = Command::new(&self.supervisor);
        command
            .arg("--pidfile")
            .arg(request.marker)
            .arg(&self.daemon)
            .arg("--port")
            .arg(request.identity.port().to_string())
            .arg("--settings")
            .arg(request.identity.configuration().as_str())
            .arg("--wsgi")
            .arg(request.entry_point);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command
    }

    fn binary_label(&self) -> String {
        self.supervisor.to_string_lossy().into_owned()
    }
}

impl Launcher for SupervisorLauncher {
    fn launch(&self, request: LaunchRequest<'_>) -> Result<(), LifecycleError> {
        let binary = self.binary_label();
        debug!(
            target: LIFECYCLE_TARGET,
            supervisor = %binary,
            marker = %request.marker.display(),
            "invoking supervisor"
        );
        let mut child = self
            .command(request)
            .spawn()
            .map_err(|source| LifecycleError::SpawnFailed {
                binary: binary.clone(),
                source: SpawnFailure::Launch(source),
            })?;
        match wait_with_deadline(&mut child, self.timeout) {
            Ok(Some(status)) if status.success() => Ok(()),
            Ok(Some(status)) => Err(LifecycleError::SpawnFailed {
                binary,
                source: SpawnFailure::Exited(status),
            }),
            Ok(None) => {
                kill_overdue(&mut child);
                Err(LifecycleError::SpawnTimedOut {
                    binary,
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
            Err(source) => Err(LifecycleError::SpawnFailed {
                binary,
                source: SpawnFailure::Wait(source),
            }),
        }
    }
}

/// Polls `child` until it exits or `timeout` elapses; `Ok(None)` on timeout.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_overdue(child: &mut Child) {
    if let Err(error) = child.kill() {
        warn!(
            target: LIFECYCLE_TARGET,
            pid = child.id(),
            error = %error,
            "failed to kill overdue supervisor"
        );
    }
    // Reap the child so it does not linger as a zombie.
    if let Err(error) = child.wait() {
        warn!(
            target: LIFECYCLE_TARGET,
            pid = child.id(),
            error = %error,
            "failed to reap overdue supervisor"
        );
    }
}

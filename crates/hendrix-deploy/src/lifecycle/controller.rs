//! High-level orchestration for lifecycle commands.
//!
//! [`LifecycleController`] sequences registry queries, supervisor launches,
//! signal delivery and marker removal. Check-then-act sequences run while the
//! registry lock is held so concurrent invocations serialise.

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::shutdown::{ProcessControl, SignalProcessControl};
use super::spawning::{LaunchRequest, Launcher, SupervisorLauncher};
use super::types::{
    InstanceStatus, LifecycleContext, LifecycleInvocation, LifecycleOutput, Liveness,
    RestartReport, StartReport, StopReport,
};
use crate::registry::{Registry, RegistryLock, ServiceIdentity};

/// Drives start/stop/restart/status against one registry.
#[derive(Debug)]
pub struct LifecycleController<L, P> {
    registry: Registry,
    launcher: L,
    processes: P,
    lock_timeout: Duration,
}

impl<L: Launcher, P: ProcessControl> LifecycleController<L, P> {
    pub fn new(registry: Registry, launcher: L, processes: P, lock_timeout: Duration) -> Self {
        Self {
            registry,
            launcher,
            processes,
            lock_timeout,
        }
    }

    /// Registry this controller writes to.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Launcher used to run the supervisor.
    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Signal and liveness facility used by `stop` and `status`.
    pub fn processes(&self) -> &P {
        &self.processes
    }

    /// Starts the daemon for `identity` through the supervisor.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::PortInUse`] when another configuration owns
    /// the port, and [`LifecycleError::SpawnFailed`] or
    /// [`LifecycleError::SpawnTimedOut`] when the supervisor does not succeed.
    /// In the latter cases any marker the supervisor left behind is removed.
    pub fn start(
        &self,
        identity: &ServiceIdentity,
        entry_point: &str,
    ) -> Result<StartReport, LifecycleError> {
        let _lock = self.lock()?;
        self.start_locked(identity, entry_point)
    }

    /// Stops the daemon recorded for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NoSuchInstance`] when no marker exists and
    /// [`LifecycleError::TerminationFailed`] when the signal cannot be
    /// delivered; the marker is left untouched in both cases.
    pub fn stop(&self, identity: &ServiceIdentity) -> Result<StopReport, LifecycleError> {
        let _lock = self.lock()?;
        self.stop_locked(identity)
    }

    /// Stops and then starts `identity`. A failed stop skips the start.
    pub fn restart(
        &self,
        identity: &ServiceIdentity,
        entry_point: &str,
    ) -> Result<RestartReport, LifecycleError> {
        let _lock = self.lock()?;
        let stopped = self.stop_locked(identity)?;
        let started = self.start_locked(identity, entry_point)?;
        Ok(RestartReport { stopped, started })
    }

    /// Describes every registry entry, including malformed ones.
    pub fn status(&self) -> Result<Vec<InstanceStatus>, LifecycleError> {
        let mut statuses = Vec::new();
        for entry in self.registry.scan()? {
            let status = match entry.identity {
                Ok(identity) => {
                    let pid = match self.registry.read_pid(&entry.path) {
                        Ok(pid) => pid,
                        Err(error) => {
                            debug!(
                                target: LIFECYCLE_TARGET,
                                path = %entry.path.display(),
                                error = %error,
                                "unreadable pid in marker"
                            );
                            None
                        }
                    };
                    let liveness = pid.map_or(Liveness::Unknown, |pid| self.processes.probe(pid));
                    InstanceStatus::Registered {
                        identity,
                        pid,
                        liveness,
                    }
                }
                Err(reason) => InstanceStatus::Malformed {
                    path: entry.path,
                    reason,
                },
            };
            statuses.push(status);
        }
        Ok(statuses)
    }

    /// Runs `invocation` and writes its confirmation lines to `output`.
    pub fn handle<W: Write, E: Write>(
        &self,
        invocation: LifecycleInvocation,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        debug!(
            target: LIFECYCLE_TARGET,
            command = %invocation.command(),
            registry = %self.registry.directory().display(),
            "running lifecycle command"
        );
        match invocation {
            LifecycleInvocation::Start {
                identity,
                entry_point,
            } => {
                let report = self.start(&identity, &entry_point)?;
                output.stdout_line(format_args!("{report}"))?;
                warn_missing_pid(&report, output)?;
            }
            LifecycleInvocation::Stop { identity } => {
                let report = self.stop(&identity)?;
                output.stdout_line(format_args!("{report}"))?;
            }
            LifecycleInvocation::Restart {
                identity,
                entry_point,
            } => {
                let report = self.restart(&identity, &entry_point)?;
                output.stdout_line(format_args!("{}", report.stopped))?;
                output.stdout_line(format_args!("{}", report.started))?;
                warn_missing_pid(&report.started, output)?;
            }
            LifecycleInvocation::Status => return self.write_status(output),
        }
        Ok(ExitCode::SUCCESS)
    }

    fn write_status<W: Write, E: Write>(
        &self,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let statuses = self.status()?;
        if statuses.is_empty() {
            output.stdout_line(format_args!(
                "no registered instances in {}",
                self.registry.directory().display()
            ))?;
            return Ok(ExitCode::SUCCESS);
        }
        for status in &statuses {
            output.stdout_line(format_args!("{status}"))?;
        }
        if statuses.iter().any(InstanceStatus::is_malformed) {
            return Ok(ExitCode::FAILURE);
        }
        Ok(ExitCode::SUCCESS)
    }

    fn lock(&self) -> Result<RegistryLock, LifecycleError> {
        Ok(RegistryLock::acquire(
            self.registry.directory(),
            self.lock_timeout,
        )?)
    }

    fn start_locked(
        &self,
        identity: &ServiceIdentity,
        entry_point: &str,
    ) -> Result<StartReport, LifecycleError> {
        if let Some(owner) = self.registry.owner_of(identity.port())? {
            return Err(LifecycleError::PortInUse {
                port: owner.port(),
                configuration: owner.configuration().clone(),
            });
        }
        let marker = self.registry.locate(identity);
        let request = LaunchRequest {
            identity,
            entry_point,
            marker: &marker,
        };
        if let Err(error) = self.launcher.launch(request) {
            // The port was free under the lock, so any marker now present was
            // written by this launch.
            discard_partial_marker(&marker);
            return Err(error);
        }
        let pid = match self.registry.read_pid(&marker) {
            Ok(pid) => pid,
            Err(error) => {
                warn!(
                    target: LIFECYCLE_TARGET,
                    marker = %marker.display(),
                    error = %error,
                    "supervisor left an unreadable pid file"
                );
                None
            }
        };
        info!(
            target: LIFECYCLE_TARGET,
            port = identity.port().get(),
            configuration = %identity.configuration(),
            pid,
            "instance started"
        );
        Ok(StartReport {
            identity: identity.clone(),
            marker,
            pid,
        })
    }

    fn stop_locked(&self, identity: &ServiceIdentity) -> Result<StopReport, LifecycleError> {
        let marker = self.registry.locate(identity);
        let Some(pid) = self.registry.read_pid(&marker)? else {
            return Err(LifecycleError::NoSuchInstance { path: marker });
        };
        self.processes.terminate(pid)?;
        remove_marker(&marker)?;
        info!(
            target: LIFECYCLE_TARGET,
            port = identity.port().get(),
            configuration = %identity.configuration(),
            pid,
            "instance stopped"
        );
        Ok(StopReport {
            identity: identity.clone(),
            pid,
        })
    }
}

/// Removes a marker after successful signal delivery.
///
/// The supervisor may already have removed it while shutting down.
fn remove_marker(marker: &Path) -> Result<(), LifecycleError> {
    match std::fs::remove_file(marker) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LifecycleError::RemoveMarker {
            path: marker.to_path_buf(),
            source,
        }),
    }
}

fn warn_missing_pid<W: Write, E: Write>(
    report: &StartReport,
    output: &mut LifecycleOutput<W, E>,
) -> Result<(), LifecycleError> {
    if report.pid.is_some() {
        return Ok(());
    }
    output.stderr_line(format_args!(
        "warning: supervisor left no readable pid in {}",
        report.marker.display()
    ))
}

fn discard_partial_marker(marker: &Path) {
    match std::fs::remove_file(marker) {
        Ok(()) => debug!(
            target: LIFECYCLE_TARGET,
            marker = %marker.display(),
            "removed partial pid file"
        ),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => warn!(
            target: LIFECYCLE_TARGET,
            marker = %marker.display(),
            error = %error,
            "failed to remove partial pid file"
        ),
    }
}

/// Production lifecycle handler wired to the configured supervisor and POSIX
/// signals.
#[derive(Debug, Default)]
pub struct SystemLifecycle;

impl SystemLifecycle {
    pub fn handle<W: Write, E: Write>(
        &mut self,
        invocation: LifecycleInvocation,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let controller = LifecycleController::new(
            Registry::from_directory(context.registry_dir),
            SupervisorLauncher::from_config(context.config),
            SignalProcessControl,
            context.config.lock_timeout(),
        );
        controller.handle(invocation, output)
    }
}

//! Values passed into and out of the lifecycle controller.
//!
//! Invocations come from the CLI parser, reports render the confirmation
//! lines, and [`LifecycleOutput`] carries whichever writers the caller owns.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use hendrix_config::{Config, RegistryDirectory};

use super::LifecycleError;
use crate::registry::{IdentityError, ServiceIdentity};

/// Action keyword as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Start,
    Stop,
    Restart,
    Status,
}

impl LifecycleCommand {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A parsed action together with the identity it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleInvocation {
    Start {
        identity: ServiceIdentity,
        entry_point: String,
    },
    Stop {
        identity: ServiceIdentity,
    },
    Restart {
        identity: ServiceIdentity,
        entry_point: String,
    },
    Status,
}

impl LifecycleInvocation {
    /// Command this invocation runs.
    #[must_use]
    pub const fn command(&self) -> LifecycleCommand {
        match self {
            Self::Start { .. } => LifecycleCommand::Start,
            Self::Stop { .. } => LifecycleCommand::Stop,
            Self::Restart { .. } => LifecycleCommand::Restart,
            Self::Status => LifecycleCommand::Status,
        }
    }
}

/// Resolved configuration handed to a lifecycle handler.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleContext<'a> {
    pub config: &'a Config,
    pub registry_dir: &'a RegistryDirectory,
}

/// Writers for confirmation lines (stdout) and warnings (stderr).
pub struct LifecycleOutput<W: Write, E: Write> {
    pub stdout: W,
    pub stderr: E,
}

impl<W: Write, E: Write> LifecycleOutput<W, E> {
    pub fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    /// Writes one flushed line to stdout.
    pub fn stdout_line(&mut self, line: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        emit_line(&mut self.stdout, line)
    }

    /// Writes one flushed line to stderr.
    pub fn stderr_line(&mut self, line: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        emit_line(&mut self.stderr, line)
    }
}

fn emit_line(sink: &mut impl Write, line: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
    writeln!(sink, "{line}")
        .and_then(|()| sink.flush())
        .map_err(LifecycleError::Io)
}

/// Outcome of a successful `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub identity: ServiceIdentity,
    pub marker: PathBuf,
    /// Pid recorded by the supervisor, when the marker was readable.
    pub pid: Option<u32>,
}

impl fmt::Display for StartReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hendrix started on port {} with settings '{}'",
            self.identity.port(),
            self.identity.configuration()
        )?;
        match self.pid {
            Some(pid) => write!(f, " (pid {pid})"),
            None => Ok(()),
        }
    }
}

/// Outcome of a successful `stop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopReport {
    pub identity: ServiceIdentity,
    pub pid: u32,
}

impl fmt::Display for StopReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stopped process {} (port {}, settings '{}')",
            self.pid,
            self.identity.port(),
            self.identity.configuration()
        )
    }
}

/// Outcome of a successful `restart`: the stop followed by the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartReport {
    pub stopped: StopReport,
    pub started: StartReport,
}

/// Whether the process recorded in a marker still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Running,
    Stale,
    Unknown,
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Stale => f.write_str("stale"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// One line of `status` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceStatus {
    Registered {
        identity: ServiceIdentity,
        pid: Option<u32>,
        liveness: Liveness,
    },
    Malformed {
        path: PathBuf,
        reason: IdentityError,
    },
}

impl InstanceStatus {
    /// True for entries whose marker name could not be parsed.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered {
                identity,
                pid: Some(pid),
                liveness,
            } => write!(
                f,
                "{} {} pid {pid} ({liveness})",
                identity.port(),
                identity.configuration()
            ),
            Self::Registered {
                identity,
                pid: None,
                liveness,
            } => write!(
                f,
                "{} {} pid ? ({liveness})",
                identity.port(),
                identity.configuration()
            ),
            Self::Malformed { path, reason } => {
                write!(f, "malformed {}: {reason}", path.display())
            }
        }
    }
}

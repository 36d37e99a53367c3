//! Error types for lifecycle operations.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::registry::{ConfigurationName, Port, RegistryError};

/// Errors raised while executing lifecycle commands.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(
        "port {port} is already in use by settings '{configuration}'; choose a different port \
         or run 'hendrix-deploy restart {configuration} <entry-point> {port}'"
    )]
    PortInUse {
        port: Port,
        configuration: ConfigurationName,
    },
    #[error("failed to start daemon via supervisor '{binary}': {source}")]
    SpawnFailed {
        binary: String,
        #[source]
        source: SpawnFailure,
    },
    #[error("supervisor '{binary}' did not finish within {timeout_ms} ms and was killed")]
    SpawnTimedOut { binary: String, timeout_ms: u64 },
    #[error("no pid file called {}; is that instance running?", path.display())]
    NoSuchInstance { path: PathBuf },
    #[error("failed to signal process {pid}: {source}")]
    TerminationFailed {
        pid: u32,
        #[source]
        source: io::Error,
    },
    #[error("refusing to signal pid {pid}: {reason}")]
    InvalidPid { pid: u32, reason: &'static str },
    #[error("failed to remove pid file {}: {source}", path.display())]
    RemoveMarker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to write lifecycle output: {0}")]
    Io(#[source] io::Error),
}

impl LifecycleError {
    /// Exit code reported by the supervisor, when the failure carries one.
    #[must_use]
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Self::SpawnFailed {
                source: SpawnFailure::Exited(status),
                ..
            } => status.code(),
            _ => None,
        }
    }
}

/// Why a supervisor invocation failed.
#[derive(Debug, Error)]
pub enum SpawnFailure {
    #[error("could not launch: {0}")]
    Launch(#[source] io::Error),
    #[error("supervisor {0}")]
    Exited(ExitStatus),
    #[error("failed while waiting for the supervisor: {0}")]
    Wait(#[source] io::Error),
}

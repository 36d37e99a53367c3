//! Errors surfaced while observing the marker-file registry.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::identity::IdentityError;

/// Errors raised by registry queries.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to list registry directory {}: {source}", path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed registry entry {}: {source}", path.display())]
    MalformedEntry {
        path: PathBuf,
        #[source]
        source: IdentityError,
    },
    #[error("failed to read pid file {}: {source}", path.display())]
    ReadPid {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("pid file {} does not contain a process id: {source}", path.display())]
    ParsePid {
        path: PathBuf,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to lock registry directory {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "registry directory {} is locked by another invocation; gave up after {timeout_ms} ms",
        path.display()
    )]
    Busy { path: PathBuf, timeout_ms: u64 },
}

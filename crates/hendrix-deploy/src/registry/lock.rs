//! Advisory lock serialising registry mutations across invocations.
//!
//! The lock is an `flock(2)` on the registry directory itself, so nothing is
//! added to the directory listing and the kernel releases it when the holder
//! exits, even abnormally. Platforms without `flock` get a no-op guard.

use std::fs::File;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::REGISTRY_TARGET;
use super::error::RegistryError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive hold on the registry directory; released on drop.
#[derive(Debug)]
pub struct RegistryLock {
    _handle: Option<File>,
}

impl RegistryLock {
    /// Acquires the lock, polling until `timeout` elapses.
    pub fn acquire(directory: &Path, timeout: Duration) -> Result<Self, RegistryError> {
        let handle = File::open(directory).map_err(|source| RegistryError::Lock {
            path: directory.to_path_buf(),
            source,
        })?;
        let deadline = Instant::now() + timeout;
        loop {
            match try_lock(&handle) {
                Ok(()) => {
                    debug!(
                        target: REGISTRY_TARGET,
                        directory = %directory.display(),
                        "registry lock acquired"
                    );
                    return Ok(Self {
                        _handle: Some(handle),
                    });
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(RegistryError::Busy {
                            path: directory.to_path_buf(),
                            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    return Err(RegistryError::Lock {
                        path: directory.to_path_buf(),
                        source,
                    });
                }
            }
        }
    }
}

#[cfg(unix)]
fn try_lock(handle: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `handle` and stays open for the call.
    let result = unsafe { libc::flock(handle.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_handle: &File) -> io::Result<()> {
    Ok(())
}

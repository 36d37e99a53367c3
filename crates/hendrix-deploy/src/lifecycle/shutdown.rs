//! Daemon termination and liveness probing.
//!
//! Signals are delivered with `kill(2)`. The daemon owns its own graceful
//! shutdown; this module only reports whether delivery succeeded.

use std::io;

use super::error::LifecycleError;
use super::types::Liveness;

#[cfg(unix)]
use libc::{SIGTERM, kill};

/// OS process-control facility used by the controller.
pub trait ProcessControl {
    /// Requests termination of `pid`.
    fn terminate(&self, pid: u32) -> Result<(), LifecycleError>;

    /// Reports whether `pid` still exists.
    fn probe(&self, pid: u32) -> Liveness;
}

/// Process control backed by POSIX signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalProcessControl;

impl ProcessControl for SignalProcessControl {
    fn terminate(&self, pid: u32) -> Result<(), LifecycleError> {
        signal_daemon(pid)
    }

    fn probe(&self, pid: u32) -> Liveness {
        probe_process(pid)
    }
}

/// Sends SIGTERM to the daemon process.
///
/// # Errors
///
/// Returns an error if:
/// - The pid is zero or outside the platform pid range (`InvalidPid`); zero
///   would address the caller's own process group.
/// - The signal cannot be delivered (`TerminationFailed`), e.g. ESRCH when
///   the process no longer exists or EPERM when it belongs to another user.
pub(super) fn signal_daemon(pid: u32) -> Result<(), LifecycleError> {
    let raw = validate_pid(pid)?;
    #[cfg(unix)]
    {
        // SAFETY: `kill(2)` is memory-safe even when the PID is invalid; the
        // kernel simply returns an error.
        let result = unsafe { kill(raw, SIGTERM) };
        if result == 0 {
            Ok(())
        } else {
            Err(LifecycleError::TerminationFailed {
                pid,
                source: io::Error::last_os_error(),
            })
        }
    }
    #[cfg(not(unix))]
    {
        let _ = raw;
        Err(LifecycleError::TerminationFailed {
            pid,
            source: io::Error::new(
                io::ErrorKind::Unsupported,
                "platform does not support signalling processes",
            ),
        })
    }
}

/// Probes `pid` with the null signal.
pub(super) fn probe_process(pid: u32) -> Liveness {
    let Ok(raw) = validate_pid(pid) else {
        return Liveness::Unknown;
    };
    #[cfg(unix)]
    {
        // SAFETY: signal 0 performs permission and existence checks only.
        if unsafe { kill(raw, 0) } == 0 {
            return Liveness::Running;
        }
        match io::Error::last_os_error().raw_os_error() {
            Some(libc::EPERM) => Liveness::Running,
            Some(libc::ESRCH) => Liveness::Stale,
            _ => Liveness::Unknown,
        }
    }
    #[cfg(not(unix))]
    {
        let _ = raw;
        Liveness::Unknown
    }
}

#[cfg(unix)]
fn validate_pid(pid: u32) -> Result<libc::pid_t, LifecycleError> {
    if pid == 0 {
        return Err(LifecycleError::InvalidPid {
            pid,
            reason: "pid 0 would signal the whole process group",
        });
    }
    libc::pid_t::try_from(pid).map_err(|_| LifecycleError::InvalidPid {
        pid,
        reason: "pid exceeds the platform pid range",
    })
}

#[cfg(not(unix))]
fn validate_pid(pid: u32) -> Result<u32, LifecycleError> {
    if pid == 0 {
        return Err(LifecycleError::InvalidPid {
            pid,
            reason: "pid 0 would signal the whole process group",
        });
    }
    Ok(pid)
}

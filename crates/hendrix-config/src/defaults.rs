use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

/// Supervisor binary used to background the daemon and record its pid.
pub const DEFAULT_SUPERVISOR_BINARY: &str = "twistd";

/// Daemon binary executed by the supervisor.
pub const DEFAULT_DAEMON_BINARY: &str = "hendrix";

/// Upper bound for a supervisor invocation, in milliseconds.
pub const DEFAULT_SPAWN_TIMEOUT_MS: u64 = 30_000;

/// Upper bound for acquiring the registry lock, in milliseconds.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Name of the directory holding marker files beneath the runtime base.
const REGISTRY_LEAF: &str = "pids";

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Owned supervisor binary name.
pub fn default_supervisor_binary() -> String {
    DEFAULT_SUPERVISOR_BINARY.to_owned()
}

/// Owned daemon binary name.
pub fn default_daemon_binary() -> String {
    DEFAULT_DAEMON_BINARY.to_owned()
}

/// Default spawn timeout.
pub fn default_spawn_timeout_ms() -> u64 {
    DEFAULT_SPAWN_TIMEOUT_MS
}

/// Default registry lock timeout.
pub fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

/// Computes the default registry directory.
///
/// Prefers `$XDG_RUNTIME_DIR/hendrix/pids`. Without a per-user runtime
/// directory the path falls back to the temporary directory, namespaced by the
/// effective user id so separate accounts never share marker files.
pub fn default_registry_dir() -> Utf8PathBuf {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("hendrix");
    if apply_namespace && let Some(namespace) = user_namespace() {
        base.push(namespace);
    }
    base.push(REGISTRY_LEAF);
    base
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(not(unix))]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    None
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> Option<String> {
    // SAFETY: geteuid(2) has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    Some(format!("uid-{uid}"))
}

#[cfg(not(unix))]
fn user_namespace() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_dir_ends_with_pids_leaf() {
        let dir = default_registry_dir();
        assert_eq!(dir.file_name(), Some(REGISTRY_LEAF));
        assert!(
            dir.components().any(|component| component.as_str() == "hendrix"),
            "expected hendrix namespace in {dir}"
        );
    }

    #[test]
    fn binary_defaults_match_constants() {
        assert_eq!(default_supervisor_binary(), DEFAULT_SUPERVISOR_BINARY);
        assert_eq!(default_daemon_binary(), DEFAULT_DAEMON_BINARY);
        assert_eq!(default_log_filter(), default_log_filter_string());
    }
}

//! Shared configuration for the hendrix deployment supervisor.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, an optional
//! TOML file (`--config-path` or `HENDRIX_CONFIG_PATH`), `HENDRIX_*`
//! environment variables, and finally command-line flags. The resulting
//! [`Config`] is passed explicitly to the registry and lifecycle controller;
//! nothing is read from process-wide state after loading.

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod runtime;

pub use defaults::{
    DEFAULT_DAEMON_BINARY, DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_SPAWN_TIMEOUT_MS,
    DEFAULT_SUPERVISOR_BINARY, default_daemon_binary, default_lock_timeout_ms, default_log_filter,
    default_log_filter_string, default_log_format, default_registry_dir, default_spawn_timeout_ms,
    default_supervisor_binary,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{RegistryDirectory, RuntimePathsError};

/// Runtime configuration shared by the CLI and its tests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HENDRIX")]
pub struct Config {
    /// Directory holding one `<port>-<settings>.pid` marker per instance.
    #[serde(default = "default_registry_dir")]
    #[ortho_config(default = default_registry_dir())]
    pub registry_dir: Utf8PathBuf,
    /// External supervisor that backgrounds the daemon and writes its pid.
    #[serde(default = "default_supervisor_binary")]
    #[ortho_config(default = default_supervisor_binary())]
    pub supervisor_binary: String,
    /// Daemon binary executed by the supervisor.
    #[serde(default = "default_daemon_binary")]
    #[ortho_config(default = default_daemon_binary())]
    pub daemon_binary: String,
    /// Milliseconds allowed for one supervisor invocation.
    #[serde(default = "default_spawn_timeout_ms")]
    #[ortho_config(default = default_spawn_timeout_ms())]
    pub spawn_timeout_ms: u64,
    /// Milliseconds allowed for acquiring the registry lock.
    #[serde(default = "default_lock_timeout_ms")]
    #[ortho_config(default = default_lock_timeout_ms())]
    pub lock_timeout_ms: u64,
    /// `tracing` filter directive applied to diagnostics on stderr.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for diagnostics.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_dir: default_registry_dir(),
            supervisor_binary: default_supervisor_binary(),
            daemon_binary: default_daemon_binary(),
            spawn_timeout_ms: default_spawn_timeout_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Directory holding the marker files.
    #[must_use]
    pub fn registry_dir(&self) -> &Utf8Path {
        self.registry_dir.as_path()
    }

    /// Supervisor binary invoked by `start`.
    #[must_use]
    pub fn supervisor_binary(&self) -> &str {
        &self.supervisor_binary
    }

    /// Daemon binary forwarded to the supervisor.
    #[must_use]
    pub fn daemon_binary(&self) -> &str {
        &self.daemon_binary
    }

    /// Spawn timeout as a [`std::time::Duration`].
    #[must_use]
    pub const fn spawn_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.spawn_timeout_ms)
    }

    /// Registry lock timeout as a [`std::time::Duration`].
    #[must_use]
    pub const fn lock_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.lock_timeout_ms)
    }

    /// Log filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_documented_defaults() {
        let config = Config::default();
        assert_eq!(config.supervisor_binary(), DEFAULT_SUPERVISOR_BINARY);
        assert_eq!(config.daemon_binary(), DEFAULT_DAEMON_BINARY);
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert_eq!(config.spawn_timeout().as_millis(), 30_000);
        assert_eq!(config.lock_timeout().as_millis(), 5_000);
    }
}

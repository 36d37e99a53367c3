//! Test support for CLI behavioural coverage.
//!
//! The world owns a temporary registry directory and a generated shell-script
//! supervisor that imitates `twistd --pidfile`: it backgrounds a long sleep,
//! records that process's pid in the marker, and logs its arguments.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, ensure};
use hendrix_config::Config;
use rstest::fixture;
use tempfile::TempDir;

use crate::{AppError, ConfigLoader, IoStreams, run_with_loader};

pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

const SUPERVISOR_LOG: &str = "supervisor.log";
const SPAWNED_PIDS: &str = "spawned.pids";

pub(crate) struct TestWorld {
    dir: TempDir,
    pub config: Config,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
}

impl TestWorld {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("create temp dir")?;
        let registry = dir.path().join("pids");
        let registry = registry.to_str().context("temp dir is not UTF-8")?;
        let mut world = Self {
            config: Config {
                registry_dir: registry.into(),
                lock_timeout_ms: 500,
                spawn_timeout_ms: 5_000,
                ..Config::default()
            },
            dir,
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
        };
        world.install_supervisor(None)?;
        Ok(world)
    }

    pub fn registry_dir(&self) -> PathBuf {
        PathBuf::from(self.config.registry_dir.as_str())
    }

    /// Writes the fake supervisor; `exit_status` makes it fail after writing
    /// the marker.
    pub fn install_supervisor(&mut self, exit_status: Option<u8>) -> Result<()> {
        let log = self.dir.path().join(SUPERVISOR_LOG);
        let spawned = self.dir.path().join(SPAWNED_PIDS);
        let tail = match exit_status {
            Some(status) => format!("exit {status}\n"),
            None => String::new(),
        };
        let script = format!(
            "#!/bin/sh\n\
             [ \"$1\" = \"--pidfile\" ] || exit 64\n\
             pidfile=\"$2\"\n\
             shift 2\n\
             echo \"$@\" >> '{log}'\n\
             sleep 30 >/dev/null 2>&1 &\n\
             echo $! > \"$pidfile\"\n\
             echo $! >> '{spawned}'\n\
             {tail}",
            log = log.display(),
            spawned = spawned.display(),
        );
        let path = self.dir.path().join("fake-supervisor");
        write_executable(&path, &script)?;
        self.config.supervisor_binary = path.to_string_lossy().into_owned();
        Ok(())
    }

    pub fn write_marker(&self, name: &str, content: &str) -> Result<()> {
        let directory = self.registry_dir();
        fs::create_dir_all(&directory).context("create registry dir")?;
        fs::write(directory.join(name), content).context("write marker")
    }

    pub fn run(&mut self, command: &str) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        let args = build_args(command);
        let loader = StaticConfigLoader::new(self.config.clone());
        let mut io = IoStreams::new(&mut self.stdout, &mut self.stderr);
        self.exit_code = Some(run_with_loader(args, &mut io, &loader));
        Ok(())
    }

    pub fn stdout_text(&self) -> Result<String> {
        String::from_utf8(self.stdout.clone()).context("stdout is not UTF-8")
    }

    pub fn stderr_text(&self) -> Result<String> {
        String::from_utf8(self.stderr.clone()).context("stderr is not UTF-8")
    }

    pub fn assert_success(&self) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::SUCCESS,
            "expected success, got {exit:?}; stderr: {}",
            self.stderr_text()?
        );
        Ok(())
    }

    pub fn assert_failure(&self) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit != ExitCode::SUCCESS,
            "expected failure, got success; stdout: {}",
            self.stdout_text()?
        );
        Ok(())
    }

    /// Ports named by the registered markers, sorted.
    pub fn registered_ports(&self) -> Result<Vec<String>> {
        let Ok(entries) = fs::read_dir(self.registry_dir()) else {
            return Ok(Vec::new());
        };
        let mut ports = Vec::new();
        for entry in entries {
            let name = entry.context("read registry entry")?.file_name();
            let name = name.to_string_lossy();
            if let Some((port, _)) = name.split_once('-') {
                ports.push(port.to_owned());
            }
        }
        ports.sort();
        Ok(ports)
    }

    pub fn supervisor_calls(&self) -> Result<Vec<String>> {
        let log = self.dir.path().join(SUPERVISOR_LOG);
        match fs::read_to_string(log) {
            Ok(content) => Ok(content.lines().map(str::to_owned).collect()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(error) => Err(error).context("read supervisor log"),
        }
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        // Terminate every sleep the fake supervisor backgrounded.
        let Ok(content) = fs::read_to_string(self.dir.path().join(SPAWNED_PIDS)) else {
            return;
        };
        for pid in content
            .lines()
            .filter_map(|line| line.trim().parse::<libc::pid_t>().ok())
            .filter(|pid| *pid > 0)
        {
            // SAFETY: signalling a pid is memory-safe; stale pids yield ESRCH.
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn write_executable(path: &Path, script: &str) -> Result<()> {
    fs::write(path, script).context("write script")?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).context("chmod script")
}

fn build_args(command: &str) -> Vec<OsString> {
    std::iter::once(OsString::from("hendrix-deploy"))
        .chain(
            command
                .trim()
                .trim_matches('"')
                .split_whitespace()
                .map(OsString::from),
        )
        .collect()
}

#[fixture]
pub(crate) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new().expect("create test world"))
}

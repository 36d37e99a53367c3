//! Runtime tests for argument handling and lifecycle dispatch.

#[cfg(unix)]
mod support;

use std::ffi::OsString;
use std::process::ExitCode;

use hendrix_config::Config;
use rstest::rstest;
use tempfile::TempDir;

use crate::lifecycle::{LifecycleCommand, LifecycleError, LifecycleInvocation};
use crate::{AppError, ConfigLoader, IoStreams, OrthoConfigLoader, run_with_handler};

struct FixedLoader {
    config: Config,
    seen: std::cell::RefCell<Vec<OsString>>,
}

impl ConfigLoader for FixedLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        self.seen.borrow_mut().extend(args.iter().cloned());
        Ok(self.config.clone())
    }
}

fn loader_in(dir: &TempDir) -> FixedLoader {
    let registry = dir.path().join("pids");
    FixedLoader {
        config: Config {
            registry_dir: registry.to_str().expect("utf8 temp dir").into(),
            ..Config::default()
        },
        seen: std::cell::RefCell::new(Vec::new()),
    }
}

fn args(tokens: &[&str]) -> Vec<OsString> {
    std::iter::once("hendrix-deploy")
        .chain(tokens.iter().copied())
        .map(OsString::from)
        .collect()
}

struct Outcome {
    exit: ExitCode,
    stdout: String,
    stderr: String,
    invocations: Vec<LifecycleInvocation>,
}

fn run_recorded<L: ConfigLoader>(loader: &L, tokens: &[&str]) -> Outcome {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut invocations = Vec::new();
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr);
        run_with_handler(args(tokens), &mut io, loader, |invocation, _, output| {
            output.stdout_line(format_args!("handled {}", invocation.command()))?;
            invocations.push(invocation);
            Ok(ExitCode::SUCCESS)
        })
    };
    Outcome {
        exit,
        stdout: String::from_utf8(stdout).expect("utf8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf8 stderr"),
        invocations,
    }
}

#[test]
fn dispatches_start_with_parsed_identity() {
    let dir = TempDir::new().expect("temp dir");
    let loader = loader_in(&dir);

    let outcome = run_recorded(&loader, &["start", "prod", "app.wsgi", "8080"]);

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(outcome.stdout, "handled start\n");
    let [LifecycleInvocation::Start {
        identity,
        entry_point,
    }] = outcome.invocations.as_slice()
    else {
        panic!("unexpected invocations: {:?}", outcome.invocations);
    };
    assert_eq!(identity.marker_file_name(), "8080-prod.pid");
    assert_eq!(entry_point, "app.wsgi");
}

#[test]
fn prepares_registry_directory_before_dispatch() {
    let dir = TempDir::new().expect("temp dir");
    let loader = loader_in(&dir);

    let outcome = run_recorded(&loader, &["status"]);

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert!(dir.path().join("pids").is_dir());
    assert_eq!(
        outcome.invocations.first().map(LifecycleInvocation::command),
        Some(LifecycleCommand::Status)
    );
}

#[test]
fn leading_configuration_flags_reach_the_loader_only() {
    let dir = TempDir::new().expect("temp dir");
    let loader = loader_in(&dir);

    let outcome = run_recorded(
        &loader,
        &["--log-filter", "debug", "stop", "prod", "app.wsgi", "8080"],
    );

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert_eq!(
        *loader.seen.borrow(),
        args(&["--log-filter", "debug"]),
    );
    assert!(matches!(
        outcome.invocations.as_slice(),
        [LifecycleInvocation::Stop { .. }]
    ));
}

#[rstest]
#[case::missing_port(&["start", "prod", "app.wsgi"], "<PORT>")]
#[case::invalid_port(&["start", "prod", "app.wsgi", "http"], "not a valid port")]
#[case::separator(&["start", "my-prod", "app.wsgi", "8080"], "must not contain '-'")]
#[case::unknown_action(&["reload", "prod", "app.wsgi", "8080"], "reload")]
#[case::no_action(&[], "Usage")]
fn usage_errors_fail_without_dispatch(#[case] tokens: &[&str], #[case] message: &str) {
    let dir = TempDir::new().expect("temp dir");
    let loader = loader_in(&dir);

    let outcome = run_recorded(&loader, tokens);

    assert_ne!(outcome.exit, ExitCode::SUCCESS);
    assert!(
        outcome.stderr.contains(message),
        "stderr {:?} lacks {message:?}",
        outcome.stderr
    );
    assert!(outcome.invocations.is_empty());
    assert!(loader.seen.borrow().is_empty());
}

#[test]
fn help_goes_to_stdout_and_succeeds() {
    let dir = TempDir::new().expect("temp dir");
    let loader = loader_in(&dir);

    let outcome = run_recorded(&loader, &["--help"]);

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("Usage"));
    assert!(outcome.stderr.is_empty());
}

#[test]
fn configuration_failure_is_reported() {
    let outcome = run_recorded(&OrthoConfigLoader, &["--spawn-timeout-ms", "soon", "status"]);

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stderr.starts_with("failed to load configuration"));
    assert!(outcome.invocations.is_empty());
}

#[test]
fn lifecycle_errors_are_printed_on_one_line() {
    let dir = TempDir::new().expect("temp dir");
    let loader = loader_in(&dir);
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr);
        run_with_handler(
            args(&["stop", "prod", "app.wsgi", "8080"]),
            &mut io,
            &loader,
            |_, _, _| {
                Err(LifecycleError::NoSuchInstance {
                    path: dir.path().join("pids/8080-prod.pid"),
                })
            },
        )
    };

    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stdout.is_empty());
    let stderr = String::from_utf8(stderr).expect("utf8 stderr");
    assert_eq!(stderr.lines().count(), 1);
    assert!(stderr.starts_with("no pid file called"));
}

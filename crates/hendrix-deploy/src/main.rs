//! CLI entrypoint for `hendrix-deploy`.
//!
//! The binary delegates to [`hendrix_deploy::run`], which loads configuration,
//! parses the lifecycle action and drives the external supervisor.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    hendrix_deploy::run(std::env::args_os(), &mut stdout, &mut stderr)
}

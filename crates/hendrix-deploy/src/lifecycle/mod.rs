//! Lifecycle management for supervised daemon instances.
//!
//! This module is split into focused submodules so each concern remains small and
//! testable:
//! - [`types`] defines the user-facing command models, reports and IO helpers.
//! - [`error`] captures the error surface exposed to the CLI.
//! - [`spawning`] runs the external supervisor.
//! - [`shutdown`] signals and probes daemon processes.
//! - [`controller`] implements the start/stop/restart/status flows.

mod controller;
mod error;
mod shutdown;
mod spawning;
mod types;

pub use controller::{LifecycleController, SystemLifecycle};
pub use error::{LifecycleError, SpawnFailure};
pub use shutdown::{ProcessControl, SignalProcessControl};
pub use spawning::{LaunchRequest, Launcher, SupervisorLauncher};
pub use types::{
    InstanceStatus, LifecycleCommand, LifecycleContext, LifecycleInvocation, LifecycleOutput,
    Liveness, RestartReport, StartReport, StopReport,
};

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::lifecycle");

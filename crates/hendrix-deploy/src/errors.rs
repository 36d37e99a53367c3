//! Error types for the CLI runtime.

use std::sync::Arc;

use hendrix_config::RuntimePathsError;
use thiserror::Error;

use crate::lifecycle::LifecycleError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    RegistryDirectory(#[from] RuntimePathsError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

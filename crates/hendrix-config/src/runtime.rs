//! Resolves and prepares the registry directory shared by every invocation.
//!
//! The registry directory holds one marker file per running instance. All
//! invocations of the tool must agree on its location so that port
//! availability checks see the markers written by earlier runs.

use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

/// Location of the marker-file registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryDirectory {
    path: PathBuf,
}

impl RegistryDirectory {
    /// Resolves the registry directory and creates it when absent.
    ///
    /// Creation is idempotent: an existing directory is accepted as-is.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimePathsError::EmptyRegistryPath`] when the configured
    /// path is empty, or [`RuntimePathsError::RegistryDirectory`] when the
    /// directory cannot be created.
    pub fn prepare(config: &Config) -> Result<Self, RuntimePathsError> {
        let directory = Self::from_config_readonly(config)?;
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        if let Err(source) = builder.create(&directory.path)
            && source.kind() != io::ErrorKind::AlreadyExists
        {
            return Err(RuntimePathsError::RegistryDirectory {
                path: directory.path,
                source,
            });
        }
        Ok(directory)
    }

    /// Resolves the registry directory without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimePathsError::EmptyRegistryPath`] when the configured
    /// path is empty.
    pub fn from_config_readonly(config: &Config) -> Result<Self, RuntimePathsError> {
        let path = config.registry_dir();
        if path.as_str().is_empty() {
            return Err(RuntimePathsError::EmptyRegistryPath);
        }
        Ok(Self {
            path: path.as_std_path().to_path_buf(),
        })
    }

    /// Directory holding the marker files.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Returns true when the directory is present on disk.
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }
}

/// Errors raised while resolving the registry directory.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// The configured registry path was empty.
    #[error("registry directory must not be empty")]
    EmptyRegistryPath,
    /// Creating the registry directory failed.
    #[error("failed to prepare registry directory '{}': {source}", path.display())]
    RegistryDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

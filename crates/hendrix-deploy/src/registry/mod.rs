//! Read-only view over the marker-file registry.
//!
//! Every answer is derived by scanning the registry directory at query time;
//! nothing is cached between calls. The lifecycle controller is the only
//! writer.
//!
//! - [`identity`] defines service identities and the marker naming scheme.
//! - [`error`] captures registry failures.
//! - [`lock`] provides the advisory lock guarding check-then-act sequences.

mod error;
mod identity;
mod lock;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hendrix_config::RegistryDirectory;
use tracing::debug;

pub use error::RegistryError;
pub use identity::{
    ConfigurationName, IdentityError, MARKER_EXTENSION, MARKER_SEPARATOR, Port, ServiceIdentity,
};
pub use lock::RegistryLock;

pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::registry");

/// One regular file found in the registry directory.
#[derive(Debug)]
pub struct ScannedEntry {
    /// Full path of the file.
    pub path: PathBuf,
    /// Identity parsed from the file name, or why parsing failed.
    pub identity: Result<ServiceIdentity, IdentityError>,
}

/// Marker-file registry rooted at a single directory.
#[derive(Debug, Clone)]
pub struct Registry {
    directory: PathBuf,
}

impl Registry {
    /// Builds a registry over `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Builds a registry over a resolved registry directory.
    pub fn from_directory(directory: &RegistryDirectory) -> Self {
        Self::new(directory.path())
    }

    /// Directory holding the marker files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Maps an identity to its marker path. The file need not exist.
    pub fn locate(&self, identity: &ServiceIdentity) -> PathBuf {
        self.directory.join(identity.marker_file_name())
    }

    /// Snapshot of every regular file in the directory, sorted by path.
    ///
    /// Unparseable names are returned alongside valid ones so callers can
    /// decide how to surface them. A missing directory is an empty registry.
    pub fn scan(&self) -> Result<Vec<ScannedEntry>, RegistryError> {
        let read_error = |source| RegistryError::ReadDirectory {
            path: self.directory.clone(),
            source,
        };
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(read_error(source)),
        };

        let mut scanned = Vec::new();
        for entry in entries {
            let path = entry.map_err(read_error)?.path();
            if !path.is_file() {
                continue;
            }
            let identity = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or(IdentityError::NonUtf8Name)
                .and_then(ServiceIdentity::from_marker_file_name);
            scanned.push(ScannedEntry { path, identity });
        }
        scanned.sort_by(|left, right| left.path.cmp(&right.path));
        debug!(
            target: REGISTRY_TARGET,
            directory = %self.directory.display(),
            entries = scanned.len(),
            "registry scanned"
        );
        Ok(scanned)
    }

    /// Lists the identities of every registered instance.
    ///
    /// The first malformed marker name aborts the listing with
    /// [`RegistryError::MalformedEntry`].
    pub fn list_identities(&self) -> Result<Vec<ServiceIdentity>, RegistryError> {
        self.scan()?
            .into_iter()
            .map(|entry| {
                entry
                    .identity
                    .map_err(|source| RegistryError::MalformedEntry {
                        path: entry.path,
                        source,
                    })
            })
            .collect()
    }

    /// Returns the identity currently registered on `port`, if any.
    pub fn owner_of(&self, port: Port) -> Result<Option<ServiceIdentity>, RegistryError> {
        Ok(self
            .list_identities()?
            .into_iter()
            .find(|identity| identity.port() == port))
    }

    /// True when no marker claims `port`.
    pub fn is_port_free(&self, port: Port) -> Result<bool, RegistryError> {
        self.owner_of(port).map(|owner| owner.is_none())
    }

    /// Reads the pid recorded in a marker file.
    ///
    /// Returns `Ok(None)` when the marker does not exist.
    pub fn read_pid(&self, path: &Path) -> Result<Option<u32>, RegistryError> {
        match fs::read_to_string(path) {
            Ok(content) => content
                .trim()
                .parse::<u32>()
                .map(Some)
                .map_err(|source| RegistryError::ParsePid {
                    path: path.to_path_buf(),
                    source,
                }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RegistryError::ReadPid {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

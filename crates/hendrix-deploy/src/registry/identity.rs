//! Service identities and their bit-exact marker-file names.
//!
//! A marker is named `<port>-<settings>.pid`. The hyphen is the only field
//! separator and the port always comes first, so configuration names are
//! forbidden from containing it and ports are rendered in canonical decimal.

use std::fmt;
use std::num::NonZeroU16;
use std::str::FromStr;

use thiserror::Error;

/// Separator between the port and the configuration name.
pub const MARKER_SEPARATOR: char = '-';

/// Extension carried by every marker file, without the leading dot.
pub const MARKER_EXTENSION: &str = "pid";

/// TCP port bound by a daemon instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Port(NonZeroU16);

impl Port {
    /// Wraps a raw port number, rejecting zero.
    pub fn new(value: u16) -> Result<Self, IdentityError> {
        NonZeroU16::new(value)
            .map(Self)
            .ok_or_else(|| IdentityError::InvalidPort {
                value: value.to_string(),
            })
    }

    /// Raw port number.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0.get()
    }
}

impl fmt::Display for Port {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for Port {
    type Err = IdentityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let value = input
            .parse::<u16>()
            .map_err(|_| IdentityError::InvalidPort {
                value: input.to_owned(),
            })?;
        Self::new(value)
    }
}

/// Name of the settings profile bound to a port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigurationName(String);

impl ConfigurationName {
    /// Borrows the validated name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigurationName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for ConfigurationName {
    type Err = IdentityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(IdentityError::EmptyConfigurationName);
        }
        if input.contains(MARKER_SEPARATOR) {
            return Err(IdentityError::SeparatorInConfigurationName {
                value: input.to_owned(),
            });
        }
        if input.starts_with('.') {
            return Err(IdentityError::HiddenConfigurationName {
                value: input.to_owned(),
            });
        }
        if let Some(character) = input
            .chars()
            .find(|character| !is_configuration_char(*character))
        {
            return Err(IdentityError::InvalidConfigurationCharacter {
                value: input.to_owned(),
                character,
            });
        }
        Ok(Self(input.to_owned()))
    }
}

fn is_configuration_char(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_' || character == '.'
}

/// Logical key of a running instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceIdentity {
    port: Port,
    configuration: ConfigurationName,
}

impl ServiceIdentity {
    /// Builds an identity from validated parts.
    #[must_use]
    pub const fn new(port: Port, configuration: ConfigurationName) -> Self {
        Self {
            port,
            configuration,
        }
    }

    /// Port bound by the instance.
    #[must_use]
    pub const fn port(&self) -> Port {
        self.port
    }

    /// Settings profile bound to the port.
    #[must_use]
    pub const fn configuration(&self) -> &ConfigurationName {
        &self.configuration
    }

    /// Marker file name for this identity, e.g. `8080-prod.pid`.
    #[must_use]
    pub fn marker_file_name(&self) -> String {
        format!(
            "{}{MARKER_SEPARATOR}{}.{MARKER_EXTENSION}",
            self.port, self.configuration
        )
    }

    /// Parses a marker file name back into an identity.
    ///
    /// The parse is strict: the extension must be `.pid`, the port field must
    /// be canonical decimal, and the configuration name must satisfy the same
    /// rules enforced on input. Anything else is reported rather than guessed.
    pub fn from_marker_file_name(name: &str) -> Result<Self, IdentityError> {
        let stem = name
            .strip_suffix(MARKER_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))
            .ok_or_else(|| IdentityError::MissingExtension {
                name: name.to_owned(),
            })?;
        let (port_field, configuration_field) =
            stem.split_once(MARKER_SEPARATOR)
                .ok_or_else(|| IdentityError::MissingSeparator {
                    name: name.to_owned(),
                })?;
        let port = port_field.parse::<Port>()?;
        if port.to_string() != port_field {
            return Err(IdentityError::NonCanonicalPort {
                value: port_field.to_owned(),
            });
        }
        let configuration = configuration_field.parse::<ConfigurationName>()?;
        Ok(Self::new(port, configuration))
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "port {} with settings '{}'",
            self.port, self.configuration
        )
    }
}

/// Reasons an identity or marker file name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("'{value}' is not a valid port; expected a number between 1 and 65535")]
    InvalidPort { value: String },
    #[error("port field '{value}' is not in canonical decimal form")]
    NonCanonicalPort { value: String },
    #[error("settings name must not be empty")]
    EmptyConfigurationName,
    #[error("settings name '{value}' must not contain '{sep}'", sep = MARKER_SEPARATOR)]
    SeparatorInConfigurationName { value: String },
    #[error("settings name '{value}' must not start with '.'")]
    HiddenConfigurationName { value: String },
    #[error(
        "settings name '{value}' contains '{character}'; use ASCII letters, digits, '_' or '.'"
    )]
    InvalidConfigurationCharacter { value: String, character: char },
    #[error("'{name}' does not end in .{ext}", ext = MARKER_EXTENSION)]
    MissingExtension { name: String },
    #[error("'{name}' lacks the '{sep}' between port and settings", sep = MARKER_SEPARATOR)]
    MissingSeparator { name: String },
    #[error("file name is not valid UTF-8")]
    NonUtf8Name,
}

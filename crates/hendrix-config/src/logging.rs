use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Shape of the diagnostic lines written to stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    #[default]
    Compact,
}

pub type LogFormatParseError = strum::ParseError;

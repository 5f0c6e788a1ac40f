//! Error types for the environment trigger core.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the settings boundary.
///
/// Threshold evaluation itself never fails.
#[derive(Error, Debug)]
pub enum Error {
    /// Setting key is not registered under the settings node.
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    /// Numeric setting outside its declared range.
    #[error("Setting {key} out of range ({min} to {max}): {value}")]
    OutOfRange {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value could not be parsed as the setting's type.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// Invalid signal name.
    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    /// Invalid direction name.
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    /// Settings file I/O error.
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed.
    #[error("Settings parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings could not be serialized.
    #[error("Settings serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

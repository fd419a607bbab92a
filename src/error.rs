//! Unified error types for sidetone

use thiserror::Error;

/// Main error type for sidetone operations
#[derive(Error, Debug)]
pub enum SidetoneError {
    /// Device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Device operation error
    #[error("Device '{device}' error: {message}")]
    DeviceError { device: String, message: String },

    /// Device reports a sample encoding we cannot convert
    #[error("Unsupported sample format on '{device}': {format}")]
    UnsupportedFormat { device: String, format: String },

    /// Stream started twice without a stop in between
    #[error("Stream already running on '{0}'")]
    AlreadyRunning(String),

    /// Preferences file could not be read or written
    #[error("Preferences I/O error on '{path}': {source}")]
    PreferencesIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Preferences file is not valid TOML
    #[error("Failed to parse preferences '{path}': {source}")]
    PreferencesParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// Preferences could not be serialized
    #[error("Failed to serialize preferences: {0}")]
    PreferencesSerialize(#[from] toml::ser::Error),

    /// Console command could not be parsed
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

/// Result type alias for sidetone operations
pub type Result<T> = std::result::Result<T, SidetoneError>;

impl SidetoneError {
    /// Create a device error with context
    pub fn device_error(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceError {
            device: device.into(),
            message: message.into(),
        }
    }
}

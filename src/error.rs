//! Error handling for the telemetry collection service
//!
//! The extraction pass itself is total and never fails; these error types
//! cover the surrounding surface (configuration, logging setup, manifest
//! loading).

use thiserror::Error;

/// Telemetry Service Error Type
#[derive(Error, Debug, Clone)]
pub enum TelemetryError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Input/Output operation errors
    #[error("IO error: {0}")]
    IoError(String),

    /// Data handling errors (serialization, parsing, conversion)
    #[error("Data error: {0}")]
    DataError(String),

    /// Decoder manifest errors (missing or inconsistent entries)
    #[error("Manifest error: {0}")]
    ManifestError(String),

    /// Validation errors (invalid parameter, unsupported operation)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type alias for the telemetry service
pub type Result<T> = std::result::Result<T, TelemetryError>;

impl TelemetryError {
    pub fn config(msg: impl Into<String>) -> Self {
        TelemetryError::ConfigError(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        TelemetryError::IoError(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        TelemetryError::DataError(msg.into())
    }

    pub fn manifest(msg: impl Into<String>) -> Self {
        TelemetryError::ManifestError(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        TelemetryError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        TelemetryError::InternalError(msg.into())
    }
}

// ============================================================================
// From implementations for external error types
// ============================================================================

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::DataError(format!("JSON: {err}"))
    }
}

impl From<serde_yaml::Error> for TelemetryError {
    fn from(err: serde_yaml::Error) -> Self {
        TelemetryError::DataError(format!("YAML: {err}"))
    }
}

// ============================================================================
// Extension trait for adding context to errors
// ============================================================================

/// Extension trait for adding context to errors
pub trait ErrorExt<T> {
    fn config_error(self, msg: &str) -> Result<T>;
    fn data_error(self, msg: &str) -> Result<T>;
    fn manifest_error(self, msg: &str) -> Result<T>;
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E> ErrorExt<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn config_error(self, msg: &str) -> Result<T> {
        self.map_err(|e| TelemetryError::ConfigError(format!("{msg}: {e}")))
    }

    fn data_error(self, msg: &str) -> Result<T> {
        self.map_err(|e| TelemetryError::DataError(format!("{msg}: {e}")))
    }

    fn manifest_error(self, msg: &str) -> Result<T> {
        self.map_err(|e| TelemetryError::ManifestError(format!("{msg}: {e}")))
    }

    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| TelemetryError::InternalError(format!("{msg}: {e}")))
    }
}

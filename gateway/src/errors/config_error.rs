use thiserror::Error;

/// Missing or invalid configuration.
///
/// Raised at startup, or when a session needs a value that was never
/// configured. Never degraded silently.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse YAML config: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn missing(name: impl Into<String>) -> Self {
        ConfigError::Missing(name.into())
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

use std::env;
use std::str::FromStr;

use crate::errors::ConfigError;

/// Read an environment variable, treating unset and blank the same.
pub(super) fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(super) fn env_string_or(name: &str, default: &str) -> String {
    env_string(name).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
pub(super) fn env_parse<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(name, format!("'{raw}': {e}"))),
        None => Ok(default),
    }
}

/// Accepts `true/false`, `1/0`, `yes/no` and `on/off`.
pub(super) fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(name, format!("'{raw}' is not a boolean"))),
    }
}

pub(super) fn env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match env_string(name) {
        Some(raw) => parse_bool(name, &raw),
        None => Ok(default),
    }
}

/// Non-empty trimmed value from an optional YAML string.
pub(super) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

use url::Url;

use super::ServerConfig;
use crate::errors::ConfigError;

/// Checks run on the final merged configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    require(&config.deepgram_api_key, "DEEPGRAM_API_KEY")?;
    if config.public_base_url.trim().is_empty() {
        return Err(ConfigError::missing("PUBLIC_BASE_URL"));
    }
    validate_public_base_url(config.public_base_url.trim())?;
    validate_agent_url(&config.agent_url)?;

    if config.session_grace_period_ms == 0 {
        return Err(ConfigError::invalid(
            "SESSION_GRACE_PERIOD_MS",
            "must be greater than zero",
        ));
    }
    if config.agent_connect_timeout_seconds == 0 {
        return Err(ConfigError::invalid(
            "AGENT_CONNECT_TIMEOUT_SECONDS",
            "must be greater than zero",
        ));
    }
    if config.rate_limit_requests_per_second == 0 || config.rate_limit_burst_size == 0 {
        return Err(ConfigError::invalid(
            "RATE_LIMIT_REQUESTS_PER_SECOND",
            "rate limit and burst size must be greater than zero",
        ));
    }

    Ok(())
}

fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::missing(name)),
    }
}

/// Must be an absolute http(s) URL with a host.
pub(super) fn validate_public_base_url(raw: &str) -> Result<(), ConfigError> {
    let parsed =
        Url::parse(raw).map_err(|e| ConfigError::invalid("PUBLIC_BASE_URL", e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            "PUBLIC_BASE_URL",
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::invalid("PUBLIC_BASE_URL", "missing host"));
    }
    Ok(())
}

fn validate_agent_url(raw: &str) -> Result<(), ConfigError> {
    let parsed =
        Url::parse(raw).map_err(|e| ConfigError::invalid("DEEPGRAM_AGENT_URL", e.to_string()))?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(ConfigError::invalid(
            "DEEPGRAM_AGENT_URL",
            format!("expected ws:// or wss://, got '{}'", parsed.scheme()),
        ));
    }
    Ok(())
}

use std::path::PathBuf;

use super::utils::{env_bool, env_parse, env_string, env_string_or};
use super::{
    DEFAULT_AGENT_CONNECT_TIMEOUT_SECONDS, DEFAULT_COMPANY_NAME, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_BURST_SIZE, DEFAULT_RATE_LIMIT_REQUESTS_PER_SECOND,
    DEFAULT_SESSION_GRACE_PERIOD_MS, ServerConfig, TlsConfig,
};
use crate::core::agent::{
    DEEPGRAM_AGENT_URL, DEFAULT_LISTEN_MODEL, DEFAULT_PERSONA_NAME, DEFAULT_SPEAK_MODEL,
    DEFAULT_THINK_MODEL, DEFAULT_THINK_PROVIDER,
};
use crate::core::telephony::TWILIO_API_BASE_URL;
use crate::errors::ConfigError;

/// Build a configuration from environment variables and defaults.
///
/// Does not validate; callers run the validation pass after any YAML merge.
pub(super) fn load() -> Result<ServerConfig, ConfigError> {
    let tls = load_tls()?;

    Ok(ServerConfig {
        host: env_string_or("HOST", DEFAULT_HOST),
        port: env_parse("PORT", DEFAULT_PORT)?,
        tls,
        public_base_url: env_string("PUBLIC_BASE_URL").unwrap_or_default(),

        deepgram_api_key: env_string("DEEPGRAM_API_KEY"),
        agent_url: env_string_or("DEEPGRAM_AGENT_URL", DEEPGRAM_AGENT_URL),
        agent_listen_model: env_string_or("AGENT_LISTEN_MODEL", DEFAULT_LISTEN_MODEL),
        agent_think_provider: env_string_or("AGENT_THINK_PROVIDER", DEFAULT_THINK_PROVIDER),
        agent_think_model: env_string_or("AGENT_THINK_MODEL", DEFAULT_THINK_MODEL),
        agent_speak_model: env_string_or("AGENT_SPEAK_MODEL", DEFAULT_SPEAK_MODEL),
        agent_persona_name: env_string_or("AGENT_PERSONA_NAME", DEFAULT_PERSONA_NAME),
        agent_connect_timeout_seconds: env_parse(
            "AGENT_CONNECT_TIMEOUT_SECONDS",
            DEFAULT_AGENT_CONNECT_TIMEOUT_SECONDS,
        )?,

        session_grace_period_ms: env_parse(
            "SESSION_GRACE_PERIOD_MS",
            DEFAULT_SESSION_GRACE_PERIOD_MS,
        )?,
        default_company_name: env_string_or("DEFAULT_COMPANY_NAME", DEFAULT_COMPANY_NAME),

        twilio_account_sid: env_string("TWILIO_ACCOUNT_SID"),
        twilio_auth_token: env_string("TWILIO_AUTH_TOKEN"),
        twilio_phone_number: env_string("TWILIO_PHONE_NUMBER"),
        twilio_api_base_url: env_string_or("TWILIO_API_BASE_URL", TWILIO_API_BASE_URL),

        cors_allowed_origins: env_string("CORS_ALLOWED_ORIGINS"),
        rate_limit_requests_per_second: env_parse(
            "RATE_LIMIT_REQUESTS_PER_SECOND",
            DEFAULT_RATE_LIMIT_REQUESTS_PER_SECOND,
        )?,
        rate_limit_burst_size: env_parse("RATE_LIMIT_BURST_SIZE", DEFAULT_RATE_LIMIT_BURST_SIZE)?,
    })
}

/// TLS is on when `TLS_ENABLED` is true; both paths are then required.
fn load_tls() -> Result<Option<TlsConfig>, ConfigError> {
    if !env_bool("TLS_ENABLED", false)? {
        return Ok(None);
    }

    let cert_path = env_string("TLS_CERT_PATH").ok_or_else(|| ConfigError::missing("TLS_CERT_PATH"))?;
    let key_path = env_string("TLS_KEY_PATH").ok_or_else(|| ConfigError::missing("TLS_KEY_PATH"))?;

    Ok(Some(TlsConfig {
        cert_path: PathBuf::from(cert_path),
        key_path: PathBuf::from(key_path),
    }))
}

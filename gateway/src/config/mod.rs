//! Configuration module for the call bridge gateway
//!
//! Configuration comes from .env files, environment variables and an optional
//! YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use callbridge_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::agent::AgentProfile;
use crate::core::relay::RelaySettings;
use crate::errors::ConfigError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_AGENT_CONNECT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_SESSION_GRACE_PERIOD_MS: u64 = 2000;
pub const DEFAULT_COMPANY_NAME: &str = "Default AI Services Inc.";
pub const DEFAULT_RATE_LIMIT_REQUESTS_PER_SECOND: u32 = 60;
pub const DEFAULT_RATE_LIMIT_BURST_SIZE: u32 = 10;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to run the gateway:
/// - Server settings (host, port, TLS, public URL)
/// - Voice agent credentials and models
/// - Relay timing
/// - Twilio REST credentials
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsConfig>,
    /// Externally reachable base URL, used for webhooks and the media stream URL
    pub public_base_url: String,

    // Voice agent
    pub deepgram_api_key: Option<String>,
    pub agent_url: String,
    pub agent_listen_model: String,
    pub agent_think_provider: String,
    pub agent_think_model: String,
    pub agent_speak_model: String,
    pub agent_persona_name: String,
    pub agent_connect_timeout_seconds: u64,

    // Relay
    /// Time the second forwarding loop gets to finish after the first one ends
    pub session_grace_period_ms: u64,

    /// Company name used until one is set through the API
    pub default_company_name: String,

    // Twilio REST API (optional, outbound calls only)
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_phone_number: Option<String>,
    pub twilio_api_base_url: String,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: u32,
}

/// Zeroize secret fields when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(key) = self.deepgram_api_key.as_mut() {
            key.zeroize();
        }
        if let Some(token) = self.twilio_auth_token.as_mut() {
            token.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// The .env file is loaded in `main` before this runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variables as base.
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Public base URL without scheme or trailing slash.
    pub fn public_host(&self) -> &str {
        let url = self.public_base_url.trim();
        let without_scheme = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        without_scheme.trim_end_matches('/')
    }

    /// Media stream URL handed to the telephony provider for a call.
    pub fn call_stream_url(&self, call_sid: &str) -> String {
        format!("wss://{}/ws/call/{}", self.public_host(), call_sid)
    }

    /// Webhook the provider calls once an outbound call is answered.
    pub fn call_start_callback_url(&self, placeholder: &str) -> String {
        format!(
            "{}/handle_call_start/{}",
            self.public_base_url.trim().trim_end_matches('/'),
            placeholder
        )
    }

    pub fn agent_profile(&self) -> AgentProfile {
        AgentProfile {
            listen_model: self.agent_listen_model.clone(),
            think_provider: self.agent_think_provider.clone(),
            think_model: self.agent_think_model.clone(),
            speak_model: self.agent_speak_model.clone(),
        }
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.session_grace_period_ms)
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            agent: self.agent_profile(),
            grace_period: self.grace_period(),
        }
    }
}

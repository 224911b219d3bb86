use std::path::PathBuf;

use super::utils::non_empty;
use super::yaml::{TlsYaml, YamlConfig};
use super::{ServerConfig, TlsConfig, env};
use crate::errors::ConfigError;

/// Environment configuration with YAML values applied on top.
pub(super) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let mut config = env::load()?;
    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        override_string(&mut config.host, server.host);
        if let Some(port) = server.port {
            config.port = port;
        }
        override_string(&mut config.public_base_url, server.public_base_url);
        if let Some(tls) = server.tls {
            config.tls = merge_tls(config.tls.take(), tls)?;
        }
    }

    if let Some(providers) = yaml.providers {
        override_option(&mut config.deepgram_api_key, providers.deepgram_api_key);
    }

    if let Some(agent) = yaml.agent {
        override_string(&mut config.agent_url, agent.url);
        override_string(&mut config.agent_listen_model, agent.listen_model);
        override_string(&mut config.agent_think_provider, agent.think_provider);
        override_string(&mut config.agent_think_model, agent.think_model);
        override_string(&mut config.agent_speak_model, agent.speak_model);
        override_string(&mut config.agent_persona_name, agent.persona_name);
        if let Some(timeout) = agent.connect_timeout_seconds {
            config.agent_connect_timeout_seconds = timeout;
        }
    }

    if let Some(grace) = yaml.relay.and_then(|relay| relay.grace_period_ms) {
        config.session_grace_period_ms = grace;
    }

    if let Some(company) = yaml.company {
        override_string(&mut config.default_company_name, company.default_name);
    }

    if let Some(twilio) = yaml.twilio {
        override_option(&mut config.twilio_account_sid, twilio.account_sid);
        override_option(&mut config.twilio_auth_token, twilio.auth_token);
        override_option(&mut config.twilio_phone_number, twilio.phone_number);
        override_string(&mut config.twilio_api_base_url, twilio.api_base_url);
    }

    if let Some(security) = yaml.security {
        override_option(&mut config.cors_allowed_origins, security.cors_allowed_origins);
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
    }

    Ok(config)
}

fn override_string(target: &mut String, value: Option<String>) {
    if let Some(value) = non_empty(value) {
        *target = value;
    }
}

fn override_option(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = non_empty(value) {
        *target = Some(value);
    }
}

/// YAML TLS settings win over env; paths missing in YAML fall back to env.
fn merge_tls(env_tls: Option<TlsConfig>, yaml: TlsYaml) -> Result<Option<TlsConfig>, ConfigError> {
    let enabled = yaml.enabled.unwrap_or(env_tls.is_some());
    if !enabled {
        return Ok(None);
    }

    let cert_path = non_empty(yaml.cert_path)
        .map(PathBuf::from)
        .or_else(|| env_tls.as_ref().map(|tls| tls.cert_path.clone()))
        .ok_or_else(|| ConfigError::missing("server.tls.cert_path"))?;
    let key_path = non_empty(yaml.key_path)
        .map(PathBuf::from)
        .or_else(|| env_tls.as_ref().map(|tls| tls.key_path.clone()))
        .ok_or_else(|| ConfigError::missing("server.tls.key_path"))?;

    Ok(Some(TlsConfig {
        cert_path,
        key_path,
    }))
}

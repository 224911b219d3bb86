use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::agent::{AgentConnector, DeepgramAgentConnector};
use crate::core::context::{CallContext, CompanyProfile, CompanyStore};
use crate::core::relay::{RelaySettings, SessionRegistry};
use crate::core::telephony::TwilioClient;

/// Shared application state handed to every handler.
///
/// Handlers read the company profile through snapshots; relay sessions only
/// ever see the [`CallContext`] built from one.
pub struct AppState {
    pub config: ServerConfig,
    pub company: CompanyStore,
    pub sessions: SessionRegistry,
    pub agent: Arc<dyn AgentConnector>,
    pub telephony: TwilioClient,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let agent = Arc::new(DeepgramAgentConnector::from_config(&config));
        Self::with_agent_connector(config, agent)
    }

    /// Build state around a specific agent connector.
    pub fn with_agent_connector(config: ServerConfig, agent: Arc<dyn AgentConnector>) -> Arc<Self> {
        let company = CompanyStore::new(CompanyProfile::new(
            Some(config.default_company_name.clone()),
            None,
        ));
        let telephony = TwilioClient::from_config(&config);

        Arc::new(Self {
            config,
            company,
            sessions: SessionRegistry::new(),
            agent,
            telephony,
        })
    }

    /// Configuration snapshot for a call that is starting now.
    pub fn call_context(&self, call_sid: &str) -> CallContext {
        CallContext::from_profile(
            call_sid,
            self.config.agent_persona_name.clone(),
            &self.company.snapshot(),
        )
    }

    pub fn relay_settings(&self) -> RelaySettings {
        self.config.relay_settings()
    }
}

//! Voice agent protocol and connection.
//!
//! The agent accepts one `SettingsConfiguration` text frame, then binary
//! linear PCM in both directions. Server text frames are informational.

mod connector;
mod messages;

pub use connector::{AgentConnector, DeepgramAgentConnector};
pub use messages::{
    AgentClientMessage, AgentEvent, AgentSettings, AudioInput, AudioOutput, AudioSettings,
    ListenSettings, SettingsConfiguration, SpeakSettings, ThinkProvider, ThinkSettings,
};

/// Default agent endpoint
pub const DEEPGRAM_AGENT_URL: &str = "wss://agent.deepgram.com/agent";

/// Rate of linear PCM sent to the agent
pub const AGENT_INPUT_SAMPLE_RATE: u32 = 16_000;

/// Rate of linear PCM received from the agent
pub const AGENT_OUTPUT_SAMPLE_RATE: u32 = 24_000;

pub const DEFAULT_LISTEN_MODEL: &str = "nova-2";
pub const DEFAULT_THINK_PROVIDER: &str = "open_ai";
pub const DEFAULT_THINK_MODEL: &str = "gpt-4o";
pub const DEFAULT_SPEAK_MODEL: &str = "aura-asteria-en";
pub const DEFAULT_PERSONA_NAME: &str = "Emma";

/// Models used by the agent for every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub listen_model: String,
    pub think_provider: String,
    pub think_model: String,
    pub speak_model: String,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            listen_model: DEFAULT_LISTEN_MODEL.to_string(),
            think_provider: DEFAULT_THINK_PROVIDER.to_string(),
            think_model: DEFAULT_THINK_MODEL.to_string(),
            speak_model: DEFAULT_SPEAK_MODEL.to_string(),
        }
    }
}

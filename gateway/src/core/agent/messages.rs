use serde::{Deserialize, Serialize};

use super::{AGENT_INPUT_SAMPLE_RATE, AGENT_OUTPUT_SAMPLE_RATE, AgentProfile};
use crate::core::audio::AudioEncoding;
use crate::core::context::CallContext;

// =============================================================================
// Client Messages
// =============================================================================

/// Frames sent to the agent.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AgentClientMessage {
    SettingsConfiguration(SettingsConfiguration),
}

impl AgentClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The one-time configuration frame that opens every agent conversation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SettingsConfiguration {
    pub audio: AudioSettings,
    pub agent: AgentSettings,
}

impl SettingsConfiguration {
    pub fn for_call(context: &CallContext, profile: &AgentProfile) -> Self {
        Self {
            audio: AudioSettings {
                input: AudioInput {
                    encoding: AudioEncoding::Linear16,
                    sample_rate: AGENT_INPUT_SAMPLE_RATE,
                },
                output: AudioOutput {
                    encoding: AudioEncoding::Linear16,
                    sample_rate: AGENT_OUTPUT_SAMPLE_RATE,
                    container: "none".to_string(),
                },
            },
            agent: AgentSettings {
                listen: ListenSettings {
                    model: profile.listen_model.clone(),
                },
                think: ThinkSettings {
                    provider: ThinkProvider {
                        provider_type: profile.think_provider.clone(),
                    },
                    model: profile.think_model.clone(),
                    instructions: context.instructions(),
                },
                speak: SpeakSettings {
                    model: profile.speak_model.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AudioSettings {
    pub input: AudioInput,
    pub output: AudioOutput,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AudioInput {
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AudioOutput {
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
    pub container: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentSettings {
    pub listen: ListenSettings,
    pub think: ThinkSettings,
    pub speak: SpeakSettings,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListenSettings {
    pub model: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThinkSettings {
    pub provider: ThinkProvider,
    pub model: String,
    pub instructions: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThinkProvider {
    #[serde(rename = "type")]
    pub provider_type: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpeakSettings {
    pub model: String,
}

// =============================================================================
// Server Events
// =============================================================================

/// Text frames received from the agent. Observed for logging only.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AgentEvent {
    Welcome {
        #[serde(alias = "request_id")]
        session_id: Option<String>,
    },
    SettingsApplied {},
    ConversationText {
        role: String,
        content: String,
    },
    UserStartedSpeaking {},
    AgentThinking {
        content: Option<String>,
    },
    AgentStartedSpeaking {
        total_latency: Option<f64>,
        tts_latency: Option<f64>,
        ttt_latency: Option<f64>,
    },
    AgentAudioDone {},
    Error {
        #[serde(alias = "message")]
        description: Option<String>,
        code: Option<String>,
    },
    Warning {
        #[serde(alias = "message")]
        description: Option<String>,
        code: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl AgentEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

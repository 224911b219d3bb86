pub mod agent;
pub mod audio;
pub mod context;
pub mod relay;
pub mod telephony;

// Re-export commonly used types for convenience
pub use agent::{AgentConnector, AgentProfile, DeepgramAgentConnector};
pub use audio::{AudioEncoding, AudioFrame, CodecError, CodecResult};
pub use context::{CallContext, CompanyProfile, CompanyStore};
pub use relay::{RelaySession, RelaySettings, SessionPhase, SessionRegistry, SessionSummary};
pub use telephony::{TelephonyError, TwilioClient};

//! Mock provider servers
//!
//! - `agent_mock` - WebSocket voice agent speaking the settings/binary PCM
//!   protocol, plus a raw TCP endpoint that refuses WebSocket upgrades

// Not every test binary uses every mock
#![allow(dead_code)]

pub mod agent_mock;

pub use agent_mock::{AgentFrame, AgentScript, MockAgentServer, spawn_rejecting_server};

//! Test Fixtures Module
//!
//! - Audio fixtures (programmatically generated)
//! - Gateway configuration and a served router
//! - Telephony media stream envelopes

// Not every test binary uses every fixture
#![allow(dead_code)]

pub mod audio_fixtures;
pub mod config_fixtures;
pub mod telephony_fixtures;

pub use audio_fixtures::*;
pub use config_fixtures::*;
pub use telephony_fixtures::*;

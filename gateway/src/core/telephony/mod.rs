//! Telephony provider integration (Twilio).
//!
//! - `messages` - media stream envelopes exchanged over the call WebSocket
//! - `media` - base64 mu-law payload encoding
//! - `twiml` - markup that points a call at the relay
//! - `client` - REST client for placing outbound calls
//! - `phone` - phone number validation

mod client;
pub mod media;
pub mod messages;
mod phone;
pub mod twiml;

pub use client::{TWILIO_API_BASE_URL, TelephonyError, TwilioClient};
pub use messages::{
    MarkPayload, MediaEnvelope, MediaFormat, MediaPayload, StartEvent, StartMetadata, StopEvent,
    TelephonyEvent,
};
pub use phone::normalize_phone_number;

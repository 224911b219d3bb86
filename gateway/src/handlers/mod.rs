//! HTTP and WebSocket request handlers
//!
//! - `api` - health, company profile, outbound calls and session listing
//! - `twilio` - call webhooks (TwiML and status callbacks)
//! - `call_stream` - telephony media stream WebSocket

pub mod api;
pub mod call_stream;
pub mod twilio;

pub use call_stream::call_stream_handler;

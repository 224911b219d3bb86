//! Telephony media stream route
//!
//! `GET /ws/call/{call_sid}` upgrades to a WebSocket that carries Twilio
//! media stream envelopes (`connected`, `start`, `media`, `mark`, `stop`).
//! Inbound audio is relayed to the voice agent; agent audio is sent back as
//! `media` envelopes on the same socket.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::call_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

pub fn create_call_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/call/{call_sid}", get(call_stream_handler))
        .layer(TraceLayer::new_for_http())
}

//! Telephony media stream WebSocket.
//!
//! Twilio connects here after receiving the TwiML from `handle_call_start`.
//! Each connection becomes one relay session.

use axum::{
    extract::{
        Path, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::core::relay::{Connection, RelaySession};
use crate::state::AppState;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

pub async fn call_stream_handler(
    ws: WebSocketUpgrade,
    Path(call_sid): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!(%call_sid, "Telephony media stream upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_call_socket(socket, call_sid, state))
}

async fn handle_call_socket(socket: WebSocket, call_sid: String, state: Arc<AppState>) {
    info!(%call_sid, "Telephony media stream connected");

    let session = RelaySession::new(
        state.call_context(&call_sid),
        Connection::from_axum(socket),
        state.agent.clone(),
        state.relay_settings(),
    );
    let session_id = session.id().to_string();

    match state.sessions.run(session).await {
        Ok(()) => info!(%call_sid, %session_id, "Relay session finished"),
        Err(e) => error!(%call_sid, %session_id, error = %e, "Relay session failed"),
    }
}

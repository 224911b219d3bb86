use axum::{Router, routing::post};
use tower_http::trace::TraceLayer;

use crate::handlers::twilio;
use crate::state::AppState;
use std::sync::Arc;

/// Create the router for Twilio call webhooks
///
/// These are called by Twilio, not by API clients.
pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/handle_call_start/{placeholder}",
            post(twilio::handle_call_start),
        )
        .route("/recording_status", post(twilio::recording_status))
        .route("/transcription_status", post(twilio::transcription_status))
        .layer(TraceLayer::new_for_http())
}

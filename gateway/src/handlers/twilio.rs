//! Webhooks called by Twilio during a call's lifetime.

use axum::{
    Form, Json,
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::core::telephony::twiml::connect_stream_twiml;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallStartForm {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
}

/// Answer an outbound call with TwiML that streams its media to us.
pub async fn handle_call_start(
    State(state): State<Arc<AppState>>,
    Path(placeholder): Path<String>,
    Form(form): Form<CallStartForm>,
) -> AppResult<Response> {
    let call_sid = form
        .call_sid
        .map(|sid| sid.trim().to_string())
        .filter(|sid| !sid.is_empty())
        .ok_or_else(|| AppError::BadRequest("CallSid missing from request.".to_string()))?;

    let stream_url = state.config.call_stream_url(&call_sid);
    info!(%call_sid, %placeholder, %stream_url, "Call answered, connecting media stream");

    Ok((
        [(CONTENT_TYPE, "application/xml")],
        connect_stream_twiml(&stream_url),
    )
        .into_response())
}

pub async fn recording_status(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    info!(
        call_sid = form.get("CallSid").map(String::as_str).unwrap_or(""),
        status = form.get("RecordingStatus").map(String::as_str).unwrap_or(""),
        fields = ?form,
        "Recording status callback"
    );
    Json(json!({ "status": "received" }))
}

pub async fn transcription_status(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    info!(
        call_sid = form.get("CallSid").map(String::as_str).unwrap_or(""),
        status = form.get("TranscriptionStatus").map(String::as_str).unwrap_or(""),
        fields = ?form,
        "Transcription status callback"
    );
    Json(json!({ "status": "received" }))
}

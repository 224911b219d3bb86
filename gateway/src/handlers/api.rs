//! JSON API for the company profile, outbound calls and session inspection.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::core::relay::SessionSummary;
use crate::core::telephony::normalize_phone_number;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

const MIN_COMPANY_NAME_LEN: usize = 2;
const MIN_KNOWLEDGE_LEN: usize = 10;
const NO_COMPANY_NAME: &str = "Not Set";
const NO_KNOWLEDGE: &str = "No knowledge summary available yet.";

#[derive(Debug, Deserialize)]
pub struct CompanyInfoRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct KnowledgeUploadRequest {
    pub knowledge_text: String,
}

#[derive(Debug, Deserialize)]
pub struct InitiateCallRequest {
    pub phone_number: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitiateCallResponse {
    pub success: bool,
    pub message: String,
    pub call_sid: String,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub count: usize,
    pub sessions: Vec<SessionSummary>,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

pub async fn get_company_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let profile = state.company.snapshot();
    let name = profile.company_name.as_deref().unwrap_or(NO_COMPANY_NAME);
    Json(json!({ "company_name": name }))
}

pub async fn set_company_info(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompanyInfoRequest>,
) -> AppResult<Json<Value>> {
    let name = request.name.trim();
    if name.chars().count() < MIN_COMPANY_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Company name must be at least {MIN_COMPANY_NAME_LEN} characters"
        )));
    }

    state.company.set_company_name(name);
    info!(company_name = name, "Company name updated");

    Ok(Json(json!({
        "success": true,
        "message": format!("Company name set to {name}"),
    })))
}

pub async fn get_knowledge(State(state): State<Arc<AppState>>) -> Json<Value> {
    let profile = state.company.snapshot();
    let summary = profile.knowledge_summary.as_deref().unwrap_or(NO_KNOWLEDGE);
    Json(json!({ "knowledge_summary": summary }))
}

pub async fn upload_knowledge(
    State(state): State<Arc<AppState>>,
    Json(request): Json<KnowledgeUploadRequest>,
) -> AppResult<Json<Value>> {
    let text = request.knowledge_text.trim();
    if text.chars().count() < MIN_KNOWLEDGE_LEN {
        return Err(AppError::BadRequest(format!(
            "Knowledge text must be at least {MIN_KNOWLEDGE_LEN} characters"
        )));
    }

    state.company.set_knowledge_summary(text);
    info!(chars = text.chars().count(), "Knowledge summary updated");

    Ok(Json(json!({
        "success": true,
        "message": "Knowledge base text stored for AI agent.",
    })))
}

/// Place an outbound call whose media will be streamed back to this server.
pub async fn initiate_call(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitiateCallRequest>,
) -> AppResult<Json<InitiateCallResponse>> {
    let phone_number = normalize_phone_number(&request.phone_number)?;
    let placeholder = format!("TEMP_{}", Uuid::new_v4());
    let callback_url = state.config.call_start_callback_url(&placeholder);

    info!(
        %phone_number,
        user_name = request.user_name.as_deref().unwrap_or(""),
        %placeholder,
        "Initiating outbound call"
    );

    let call_sid = state
        .telephony
        .place_call(&phone_number, &callback_url)
        .await
        .inspect_err(|e| error!(%phone_number, error = %e, "Call initiation failed"))?;

    info!(%call_sid, %placeholder, "Outbound call created");

    Ok(Json(InitiateCallResponse {
        success: true,
        message: format!("Call initiated to {phone_number}"),
        call_sid,
    }))
}

pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionsResponse> {
    let sessions = state.sessions.snapshot();
    Json(SessionsResponse {
        count: sessions.len(),
        sessions,
    })
}

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::api;
use crate::state::AppState;
use std::sync::Arc;

/// Create the JSON API router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route(
            "/company_info",
            get(api::get_company_info).post(api::set_company_info),
        )
        .route("/get_knowledge", get(api::get_knowledge))
        .route("/upload_knowledge", post(api::upload_knowledge))
        .route("/initiate_call", post(api::initiate_call))
        .route("/sessions", get(api::list_sessions))
        .layer(TraceLayer::new_for_http())
}

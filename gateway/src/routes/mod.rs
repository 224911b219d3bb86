pub mod api;
pub mod call;
pub mod webhooks;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// All gateway routes with state applied, without server-level layers.
pub fn create_router(state: Arc<AppState>) -> Router {
    api::create_api_router()
        .merge(webhooks::create_webhook_router())
        .merge(call::create_call_router())
        .with_state(state)
}

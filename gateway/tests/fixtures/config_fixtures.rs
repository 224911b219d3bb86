//! Gateway configuration and server helpers.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use callbridge_gateway::{ServerConfig, routes, state::AppState};

pub const TEST_PUBLIC_URL: &str = "https://calls.example.com";
pub const TEST_API_KEY: &str = "test-agent-key";

/// Minimal valid configuration pointing the agent at `agent_url`
pub fn test_config(agent_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: None,
        public_base_url: TEST_PUBLIC_URL.to_string(),
        deepgram_api_key: Some(TEST_API_KEY.to_string()),
        agent_url: agent_url.to_string(),
        agent_listen_model: "nova-2".to_string(),
        agent_think_provider: "open_ai".to_string(),
        agent_think_model: "gpt-4o".to_string(),
        agent_speak_model: "aura-asteria-en".to_string(),
        agent_persona_name: "Emma".to_string(),
        agent_connect_timeout_seconds: 5,
        session_grace_period_ms: 500,
        default_company_name: "Default AI Services Inc.".to_string(),
        twilio_account_sid: None,
        twilio_auth_token: None,
        twilio_phone_number: None,
        twilio_api_base_url: "https://api.twilio.com".to_string(),
        cors_allowed_origins: None,
        rate_limit_requests_per_second: 60,
        rate_limit_burst_size: 10,
    }
}

/// Serve the full router on an ephemeral port
pub async fn spawn_gateway(config: ServerConfig) -> (SocketAddr, Arc<AppState>) {
    let state = AppState::new(config);
    let app = routes::create_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// An address nothing is listening on
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

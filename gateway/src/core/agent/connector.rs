use async_trait::async_trait;
use http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use std::time::Duration;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, client::IntoClientRequest},
};
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::config::ServerConfig;
use crate::core::context::CallContext;
use crate::core::relay::transport::Connection;
use crate::errors::{ConfigError, RelayError, RelayResult};

/// Opens the agent side of a relay session.
#[async_trait]
pub trait AgentConnector: Send + Sync {
    /// Open a fresh agent connection for the call in `context`.
    ///
    /// The returned connection has completed its handshake but has not been
    /// sent any frames.
    async fn connect(&self, context: &CallContext) -> RelayResult<Connection>;
}

/// WebSocket connector for the Deepgram voice agent.
pub struct DeepgramAgentConnector {
    url: String,
    api_key: Option<String>,
    connect_timeout: Duration,
}

impl DeepgramAgentConnector {
    pub fn new(url: impl Into<String>, api_key: Option<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            api_key,
            connect_timeout,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.agent_url.clone(),
            config.deepgram_api_key.clone(),
            Duration::from_secs(config.agent_connect_timeout_seconds),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_request(&self, api_key: &str) -> RelayResult<http::Request<()>> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ConfigError::invalid("agent url", e.to_string()))?;

        let mut auth = HeaderValue::from_str(&format!("Token {api_key}"))
            .map_err(|e| ConfigError::invalid("DEEPGRAM_API_KEY", e.to_string()))?;
        auth.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, auth);

        Ok(request)
    }
}

#[async_trait]
impl AgentConnector for DeepgramAgentConnector {
    async fn connect(&self, context: &CallContext) -> RelayResult<Connection> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::missing("DEEPGRAM_API_KEY"))?;

        let request = self.build_request(api_key)?;

        info!(call_sid = %context.call_sid, url = %self.url, "Connecting to voice agent");

        let (socket, response) =
            match tokio::time::timeout(self.connect_timeout, connect_async(request)).await {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => return Err(classify_connect_error(e)),
                Err(_) => {
                    warn!(call_sid = %context.call_sid, "Voice agent connection timed out");
                    return Err(RelayError::UpstreamConnect(format!(
                        "timed out after {}s",
                        self.connect_timeout.as_secs_f32()
                    )));
                }
            };

        debug!(
            call_sid = %context.call_sid,
            status = %response.status(),
            "Voice agent handshake complete"
        );

        Ok(Connection::from_tungstenite(socket))
    }
}

impl Drop for DeepgramAgentConnector {
    fn drop(&mut self) {
        if let Some(ref mut key) = self.api_key {
            key.zeroize();
        }
    }
}

fn classify_connect_error(error: tungstenite::Error) -> RelayError {
    match &error {
        tungstenite::Error::Http(response)
            if matches!(
                response.status(),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            ) =>
        {
            RelayError::UpstreamAuth(format!(
                "handshake rejected with status {}",
                response.status()
            ))
        }
        _ => RelayError::UpstreamConnect(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::CompanyProfile;
    use std::net::TcpListener;

    fn context() -> CallContext {
        CallContext::from_profile("CA-test", "Emma", &CompanyProfile::default())
    }

    #[test]
    fn test_request_carries_token_header() {
        let connector = DeepgramAgentConnector::new(
            "wss://agent.example.com/agent",
            Some("secret".into()),
            Duration::from_secs(5),
        );
        let request = connector.build_request("secret").unwrap();

        assert_eq!(request.uri().host(), Some("agent.example.com"));
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Token secret"
        );
        assert!(request.headers().contains_key("sec-websocket-key"));
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let connector =
            DeepgramAgentConnector::new("not a url", Some("k".into()), Duration::from_secs(1));
        assert!(matches!(
            connector.build_request("k"),
            Err(RelayError::Config(ConfigError::Invalid { .. }))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let connector =
            DeepgramAgentConnector::new("ws://127.0.0.1:9/agent", None, Duration::from_secs(1));
        let result = connector.connect(&context()).await;
        assert!(matches!(
            result,
            Err(RelayError::Config(ConfigError::Missing(_)))
        ));

        let connector = DeepgramAgentConnector::new(
            "ws://127.0.0.1:9/agent",
            Some(String::new()),
            Duration::from_secs(1),
        );
        assert!(matches!(
            connector.connect(&context()).await,
            Err(RelayError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_is_upstream_error() {
        // Bind then drop to get a port with nothing listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let connector = DeepgramAgentConnector::new(
            format!("ws://127.0.0.1:{port}/agent"),
            Some("key".into()),
            Duration::from_secs(2),
        );

        let error = connector.connect(&context()).await.err().unwrap();
        assert!(matches!(error, RelayError::UpstreamConnect(_)), "{error:?}");
        assert!(error.is_upstream_connect());
    }

    #[tokio::test]
    async fn test_unauthorized_handshake_is_auth_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let _ = stream
                .write_all(b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\n\r\n")
                .await;
        });

        let connector = DeepgramAgentConnector::new(
            format!("ws://127.0.0.1:{port}/agent"),
            Some("bad-key".into()),
            Duration::from_secs(2),
        );
        let error = connector.connect(&context()).await.err().unwrap();
        assert!(matches!(error, RelayError::UpstreamAuth(_)), "{error:?}");
        assert_eq!(
            error.telephony_close_reason().reason,
            "AI Agent authentication error"
        );
    }
}

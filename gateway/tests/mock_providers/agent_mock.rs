//! WebSocket mock for the voice agent.
//!
//! Records every frame the relay sends and replies according to an
//! [`AgentScript`].

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        Message,
        handshake::server::{ErrorResponse, Request, Response},
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};

/// A frame received from the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentFrame {
    Settings(Value),
    Text(String),
    Audio(Vec<u8>),
    Close(Option<u16>),
}

/// How the mock agent behaves on each connection.
#[derive(Debug, Clone, Default)]
pub struct AgentScript {
    /// PCM sent back once, after the first audio frame from the relay
    pub audio_reply: Option<Vec<u8>>,
    /// Close the connection right after the settings message
    pub hang_up_after_settings: bool,
}

pub struct MockAgentServer {
    pub addr: SocketAddr,
    frames: mpsc::UnboundedReceiver<AgentFrame>,
    auth_headers: Arc<Mutex<Vec<String>>>,
}

impl MockAgentServer {
    pub async fn start(script: AgentScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, frames) = mpsc::unbounded_channel();
        let auth_headers = Arc::new(Mutex::new(Vec::new()));

        let headers = auth_headers.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let script = script.clone();
                let tx = tx.clone();
                let headers = headers.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, script, tx, headers).await;
                });
            }
        });

        Self {
            addr,
            frames,
            auth_headers,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/agent", self.addr)
    }

    /// Next frame received from the relay.
    pub async fn next_frame(&mut self) -> Option<AgentFrame> {
        tokio::time::timeout(Duration::from_secs(5), self.frames.recv())
            .await
            .expect("timed out waiting for a frame at the mock agent")
    }

    pub fn auth_headers(&self) -> Vec<String> {
        self.auth_headers.lock().unwrap().clone()
    }
}

async fn handle_connection(
    stream: TcpStream,
    script: AgentScript,
    tx: mpsc::UnboundedSender<AgentFrame>,
    headers: Arc<Mutex<Vec<String>>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let capture = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if let Some(value) = request.headers().get("authorization") {
            headers
                .lock()
                .unwrap()
                .push(value.to_str().unwrap_or_default().to_string());
        }
        Ok(response)
    };
    let ws_stream = accept_hdr_async(stream, capture).await?;
    let (mut write, mut read) = ws_stream.split();
    let mut audio_reply = script.audio_reply;

    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => {
                let value: Value = match serde_json::from_str(text.as_str()) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = tx.send(AgentFrame::Text(text.as_str().to_string()));
                        continue;
                    }
                };
                if value["type"] != "SettingsConfiguration" {
                    let _ = tx.send(AgentFrame::Text(text.as_str().to_string()));
                    continue;
                }
                let _ = tx.send(AgentFrame::Settings(value));

                let welcome = json!({"type": "Welcome", "session_id": "mock-session"});
                write.send(Message::Text(welcome.to_string().into())).await?;
                let applied = json!({"type": "SettingsApplied"});
                write.send(Message::Text(applied.to_string().into())).await?;

                if script.hang_up_after_settings {
                    write
                        .send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "mock agent done".into(),
                        })))
                        .await?;
                }
            }
            Message::Binary(data) => {
                let _ = tx.send(AgentFrame::Audio(data.to_vec()));
                if let Some(reply) = audio_reply.take() {
                    let text = json!({
                        "type": "ConversationText",
                        "role": "assistant",
                        "content": "Hello from the mock agent"
                    });
                    write.send(Message::Text(text.to_string().into())).await?;
                    write.send(Message::Binary(reply.into())).await?;
                }
            }
            Message::Close(frame) => {
                let _ = tx.send(AgentFrame::Close(frame.map(|f| u16::from(f.code))));
                break;
            }
            _ => {}
        }
    }

    // Let tungstenite finish the closing handshake
    let _ = write.close().await;
    Ok(())
}

/// A TCP server that answers every WebSocket upgrade with `status`.
pub async fn spawn_rejecting_server(status: u16, reason: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    addr
}

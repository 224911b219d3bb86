//! Duplex frame transport shared by both sides of the relay.
//!
//! The telephony side arrives as an axum server socket and the agent side as
//! a tokio-tungstenite client stream. Both are reduced to the same [`Frame`]
//! sink/stream pair so the forwarding loops never see library types.

use axum::extract::ws::{self, WebSocket};
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_tungstenite::{WebSocketStream, tungstenite};
use tracing::{debug, warn};

use crate::errors::TransportError;

/// Normal closure
pub const CLOSE_NORMAL: u16 = 1000;

/// Internal or agent error
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

pub const AGENT_CONNECT_FAILED_REASON: &str = "Failed to connect to AI Agent";
pub const AGENT_AUTH_FAILED_REASON: &str = "AI Agent authentication error";
pub const CONFIG_ERROR_REASON: &str = "Internal configuration error";
pub const AGENT_CLOSED_REASON: &str = "Agent connection closed";
pub const TELEPHONY_ENDED_REASON: &str = "Telephony stream ended";
pub const CLEANUP_REASON: &str = "Handler finished cleanup";
pub const INTERNAL_RELAY_ERROR_REASON: &str = "Internal relay error";

/// Upper bound on sending a close frame and flushing.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Which connection of the bridge a frame or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Telephony,
    Agent,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Telephony => write!(f, "telephony"),
            Side::Agent => write!(f, "agent"),
        }
    }
}

/// Close code and reason carried by a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    pub fn normal(reason: impl Into<String>) -> Self {
        Self {
            code: CLOSE_NORMAL,
            reason: reason.into(),
        }
    }

    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self {
            code: CLOSE_INTERNAL_ERROR,
            reason: reason.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.code != CLOSE_NORMAL
    }
}

/// A single WebSocket frame, minus ping/pong which the socket libraries answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
    Close(Option<CloseReason>),
}

pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// A duplex connection split into its sending and receiving halves.
pub struct Connection {
    sink: FrameSink,
    stream: FrameStream,
}

impl Connection {
    pub fn new<Si, St>(sink: Si, stream: St) -> Self
    where
        Si: Sink<Frame, Error = TransportError> + Send + 'static,
        St: Stream<Item = Result<Frame, TransportError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }

    /// Wrap an accepted axum WebSocket.
    pub fn from_axum(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();

        // Sink errors convert through `From`, which may run any number of times
        let sink =
            sink.with(|frame: Frame| future::ready(Ok::<_, TransportError>(frame_to_axum(frame))));

        let stream = stream.filter_map(|message| {
            future::ready(match message {
                Ok(message) => frame_from_axum(message).map(Ok),
                Err(e) => Some(Err(TransportError::from(e))),
            })
        });

        Self::new(sink, stream)
    }

    /// Wrap a tokio-tungstenite stream (client or server role).
    pub fn from_tungstenite<S>(socket: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = socket.split();

        let sink = sink.with(|frame: Frame| {
            future::ready(Ok::<_, TransportError>(frame_to_tungstenite(frame)))
        });

        let stream = stream.filter_map(|message| {
            future::ready(match message {
                Ok(message) => frame_from_tungstenite(message).map(Ok),
                Err(e) => Some(Err(TransportError::from(e))),
            })
        });

        Self::new(sink, stream)
    }

    pub fn split(self) -> (FrameSink, FrameStream) {
        (self.sink, self.stream)
    }
}

/// Sending half shared by a forwarding loop and the session supervising it.
///
/// The forwarding loop is the only regular writer. The session takes the lock
/// only after that loop has stopped, to close the connection during cleanup.
#[derive(Clone)]
pub struct SharedSink {
    inner: Arc<Mutex<FrameSink>>,
    side: Side,
}

impl SharedSink {
    pub fn new(sink: FrameSink, side: Side) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
            side,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        self.inner.lock().await.send(frame).await
    }

    /// Send a close frame and close the sink, giving up after a short timeout.
    ///
    /// Closing an already closed connection is not an error.
    pub async fn close_with(&self, reason: CloseReason) {
        let code = reason.code;
        let result = tokio::time::timeout(CLOSE_TIMEOUT, async {
            let mut sink = self.inner.lock().await;
            sink.send(Frame::Close(Some(reason))).await?;
            sink.close().await
        })
        .await;

        match result {
            Ok(Ok(())) => debug!(side = %self.side, code, "Connection closed"),
            Ok(Err(e)) => debug!(side = %self.side, code, error = %e, "Connection already closed"),
            Err(_) => warn!(side = %self.side, code, "Timed out closing connection"),
        }
    }
}

fn frame_to_axum(frame: Frame) -> ws::Message {
    match frame {
        Frame::Text(text) => ws::Message::Text(text.into()),
        Frame::Binary(data) => ws::Message::Binary(data),
        Frame::Close(reason) => ws::Message::Close(reason.map(|r| ws::CloseFrame {
            code: r.code,
            reason: r.reason.into(),
        })),
    }
}

fn frame_from_axum(message: ws::Message) -> Option<Frame> {
    match message {
        ws::Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        ws::Message::Binary(data) => Some(Frame::Binary(data)),
        ws::Message::Close(frame) => Some(Frame::Close(frame.map(|f| CloseReason {
            code: f.code,
            reason: f.reason.as_str().to_owned(),
        }))),
        ws::Message::Ping(_) | ws::Message::Pong(_) => None,
    }
}

fn frame_to_tungstenite(frame: Frame) -> tungstenite::Message {
    use tungstenite::protocol::{CloseFrame, frame::coding::CloseCode};

    match frame {
        Frame::Text(text) => tungstenite::Message::Text(text.into()),
        Frame::Binary(data) => tungstenite::Message::Binary(data),
        Frame::Close(reason) => tungstenite::Message::Close(reason.map(|r| CloseFrame {
            code: CloseCode::from(r.code),
            reason: r.reason.into(),
        })),
    }
}

fn frame_from_tungstenite(message: tungstenite::Message) -> Option<Frame> {
    match message {
        tungstenite::Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        tungstenite::Message::Binary(data) => Some(Frame::Binary(data)),
        tungstenite::Message::Close(frame) => Some(Frame::Close(frame.map(|f| CloseReason {
            code: u16::from(f.code),
            reason: f.reason.as_str().to_owned(),
        }))),
        tungstenite::Message::Ping(_)
        | tungstenite::Message::Pong(_)
        | tungstenite::Message::Frame(_) => None,
    }
}

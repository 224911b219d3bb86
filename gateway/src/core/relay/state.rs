//! Session lifecycle and per-stream state.

use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

/// Placeholder logged while the telephony stream id is still unknown.
pub const UNKNOWN_STREAM_SID: &str = "UNKNOWN";

/// Lifecycle of one relay session.
///
/// ```text
/// Initializing -> ConnectingUpstream -> Streaming -> Closing -> Closed
///        \________________\_________________\__________\-----> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Initializing,
    ConnectingUpstream,
    Streaming,
    Closing,
    Closed,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Closed | SessionPhase::Failed)
    }

    pub fn can_transition_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;

        match (self, next) {
            (Closed | Failed, _) => false,
            (_, Failed) => true,
            (Initializing, ConnectingUpstream)
            | (ConnectingUpstream, Streaming)
            | (Streaming, Closing)
            | (Closing, Closed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Initializing => "INITIALIZING",
            SessionPhase::ConnectingUpstream => "CONNECTING_UPSTREAM",
            SessionPhase::Streaming => "STREAMING",
            SessionPhase::Closing => "CLOSING",
            SessionPhase::Closed => "CLOSED",
            SessionPhase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Status of one side's connection as seen by the loop reading from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    NotConnected,
    Connected,
    Closing,
    Closed,
}

impl LinkStatus {
    pub fn is_open(self) -> bool {
        matches!(self, LinkStatus::Connected)
    }
}

/// Mutable per-session stream fields.
///
/// Each field has exactly one writer: [`TelephonyLinkWriter`] owns the stream
/// id and the telephony status, [`AgentLinkWriter`] owns the agent status.
/// Both loops read everything through a [`StreamStateView`].
pub struct StreamState {
    telephony: TelephonyLinkWriter,
    agent: AgentLinkWriter,
    view: StreamStateView,
}

impl StreamState {
    /// Fresh state for an accepted telephony connection.
    pub fn new() -> Self {
        let (stream_sid_tx, stream_sid_rx) = watch::channel(None);
        let (telephony_tx, telephony_rx) = watch::channel(LinkStatus::Connected);
        let (agent_tx, agent_rx) = watch::channel(LinkStatus::NotConnected);

        Self {
            telephony: TelephonyLinkWriter {
                stream_sid: stream_sid_tx,
                status: telephony_tx,
            },
            agent: AgentLinkWriter { status: agent_tx },
            view: StreamStateView {
                stream_sid: stream_sid_rx,
                telephony: telephony_rx,
                agent: agent_rx,
            },
        }
    }

    pub fn view(&self) -> StreamStateView {
        self.view.clone()
    }

    pub fn into_writers(self) -> (TelephonyLinkWriter, AgentLinkWriter) {
        (self.telephony, self.agent)
    }
}

impl Default for StreamState {
    fn default() -> Self {
        Self::new()
    }
}

/// Write access to the telephony-side fields.
pub struct TelephonyLinkWriter {
    stream_sid: watch::Sender<Option<String>>,
    status: watch::Sender<LinkStatus>,
}

impl TelephonyLinkWriter {
    /// Record the stream id. Only the first call has any effect.
    pub fn set_stream_sid(&self, stream_sid: &str) -> bool {
        self.stream_sid.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(stream_sid.to_owned());
            true
        })
    }

    pub fn set_status(&self, status: LinkStatus) {
        self.status.send_replace(status);
    }
}

/// Write access to the agent-side fields.
pub struct AgentLinkWriter {
    status: watch::Sender<LinkStatus>,
}

impl AgentLinkWriter {
    pub fn set_status(&self, status: LinkStatus) {
        self.status.send_replace(status);
    }
}

/// Read-only view shared by both forwarding loops.
#[derive(Clone)]
pub struct StreamStateView {
    stream_sid: watch::Receiver<Option<String>>,
    telephony: watch::Receiver<LinkStatus>,
    agent: watch::Receiver<LinkStatus>,
}

impl StreamStateView {
    pub fn stream_sid(&self) -> Option<String> {
        self.stream_sid.borrow().clone()
    }

    pub fn stream_sid_or_unknown(&self) -> String {
        self.stream_sid()
            .unwrap_or_else(|| UNKNOWN_STREAM_SID.to_string())
    }

    pub fn telephony_status(&self) -> LinkStatus {
        *self.telephony.borrow()
    }

    pub fn agent_status(&self) -> LinkStatus {
        *self.agent.borrow()
    }
}

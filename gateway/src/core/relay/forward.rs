//! The two forwarding loops of a relay session.
//!
//! Each loop reads one connection and writes the other. When its receive side
//! ends it closes the connection it writes to, which is the only signal the
//! other loop gets.

use bytes::Bytes;
use futures::StreamExt;
use std::fmt;
use tracing::{debug, info, warn};

use super::state::{AgentLinkWriter, LinkStatus, StreamStateView, TelephonyLinkWriter};
use super::transport::{
    AGENT_CLOSED_REASON, CLEANUP_REASON, CloseReason, Frame, FrameStream, SharedSink, Side,
    TELEPHONY_ENDED_REASON,
};
use crate::core::agent::AgentEvent;
use crate::core::audio::{AudioFrame, CodecResult};
use crate::core::telephony::media::{decode_media_payload, encode_media_payload};
use crate::core::telephony::{MediaEnvelope, TelephonyEvent};
use crate::errors::TransportError;

/// Direction of a forwarding loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    TelephonyToAgent,
    AgentToTelephony,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::TelephonyToAgent => write!(f, "telephony->agent"),
            Direction::AgentToTelephony => write!(f, "agent->telephony"),
        }
    }
}

/// Why a forwarding loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The telephony side sent `stop`
    StopEvent,
    PeerClosed {
        side: Side,
        reason: Option<CloseReason>,
    },
    ReceiveFailed {
        side: Side,
        error: TransportError,
    },
    SendFailed {
        side: Side,
        error: TransportError,
    },
}

/// Telephony media payload to agent input PCM.
pub fn telephony_payload_to_agent_pcm(payload: &str, agent_rate: u32) -> CodecResult<AudioFrame> {
    decode_media_payload(payload)?
        .to_linear16()?
        .resample(agent_rate)
}

/// Agent output PCM to a telephony media payload, or `None` for empty audio.
pub fn agent_pcm_to_telephony_payload(pcm: Bytes, agent_rate: u32) -> CodecResult<Option<String>> {
    let mulaw = AudioFrame::linear16(pcm, agent_rate).to_mulaw()?;
    if mulaw.is_empty() {
        return Ok(None);
    }
    encode_media_payload(&mulaw).map(Some)
}

pub(crate) struct TelephonyToAgent {
    pub call_sid: String,
    pub telephony_rx: FrameStream,
    pub agent_tx: SharedSink,
    pub link: TelephonyLinkWriter,
    pub agent_rate: u32,
}

impl TelephonyToAgent {
    pub async fn run(mut self) -> LoopExit {
        let call_sid = self.call_sid.as_str();
        let mut forwarded: u64 = 0;

        let exit = loop {
            let frame = match self.telephony_rx.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(error)) => {
                    break LoopExit::ReceiveFailed {
                        side: Side::Telephony,
                        error,
                    };
                }
                None => {
                    break LoopExit::PeerClosed {
                        side: Side::Telephony,
                        reason: None,
                    };
                }
            };

            let text = match frame {
                Frame::Text(text) => text,
                Frame::Binary(data) => {
                    debug!(call_sid, bytes = data.len(), "Ignoring binary frame from telephony");
                    continue;
                }
                Frame::Close(reason) => {
                    break LoopExit::PeerClosed {
                        side: Side::Telephony,
                        reason,
                    };
                }
            };

            let event = match TelephonyEvent::parse(&text) {
                Ok(event) => event,
                Err(e) => {
                    warn!(call_sid, error = %e, "Dropping malformed telephony envelope");
                    continue;
                }
            };

            match event {
                TelephonyEvent::Connected { protocol, version } => {
                    debug!(call_sid, ?protocol, ?version, "Telephony stream connected");
                }
                TelephonyEvent::Start(start) => match start.stream_sid() {
                    Some(stream_sid) => {
                        if self.link.set_stream_sid(stream_sid) {
                            info!(call_sid, stream_sid, "Telephony stream started");
                        } else {
                            warn!(call_sid, stream_sid, "Ignoring repeated start event");
                        }
                    }
                    None => warn!(call_sid, "Start event without a stream id"),
                },
                TelephonyEvent::Media { media } => {
                    if media.payload.is_empty() {
                        continue;
                    }
                    let pcm = match telephony_payload_to_agent_pcm(&media.payload, self.agent_rate) {
                        Ok(pcm) => pcm,
                        Err(e) => {
                            warn!(call_sid, error = %e, "Dropping undecodable media payload");
                            continue;
                        }
                    };
                    if pcm.is_empty() {
                        continue;
                    }
                    if let Err(error) = self.agent_tx.send(Frame::Binary(pcm.into_bytes())).await {
                        break LoopExit::SendFailed {
                            side: Side::Agent,
                            error,
                        };
                    }
                    forwarded += 1;
                }
                TelephonyEvent::Stop(_) => {
                    info!(call_sid, "Telephony stream stopped");
                    break LoopExit::StopEvent;
                }
                TelephonyEvent::Mark { mark } => {
                    info!(call_sid, mark = %mark.name, "Mark acknowledged");
                }
                TelephonyEvent::Unknown => {
                    debug!(call_sid, "Ignoring unrecognized telephony event");
                }
            }
        };

        let status = match exit {
            LoopExit::StopEvent => LinkStatus::Closing,
            _ => LinkStatus::Closed,
        };
        self.link.set_status(status);

        self.agent_tx
            .close_with(CloseReason::normal(TELEPHONY_ENDED_REASON))
            .await;

        info!(call_sid, frames = forwarded, exit = ?exit, "Telephony to agent loop finished");
        exit
    }
}

pub(crate) struct AgentToTelephony {
    pub call_sid: String,
    pub agent_rx: FrameStream,
    pub telephony_tx: SharedSink,
    pub link: AgentLinkWriter,
    pub view: StreamStateView,
    pub agent_rate: u32,
}

impl AgentToTelephony {
    pub async fn run(mut self) -> LoopExit {
        let call_sid = self.call_sid.as_str();
        let mut forwarded: u64 = 0;

        let exit = loop {
            let frame = match self.agent_rx.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(error)) => {
                    break LoopExit::ReceiveFailed {
                        side: Side::Agent,
                        error,
                    };
                }
                None => {
                    break LoopExit::PeerClosed {
                        side: Side::Agent,
                        reason: None,
                    };
                }
            };

            match frame {
                Frame::Binary(pcm) => {
                    if pcm.is_empty() {
                        continue;
                    }
                    if !self.view.telephony_status().is_open() {
                        debug!(call_sid, "Telephony side not open, dropping agent audio");
                        continue;
                    }
                    let Some(stream_sid) = self.view.stream_sid() else {
                        debug!(call_sid, "No stream id yet, dropping agent audio");
                        continue;
                    };

                    let payload = match agent_pcm_to_telephony_payload(pcm, self.agent_rate) {
                        Ok(Some(payload)) => payload,
                        Ok(None) => continue,
                        Err(e) => {
                            warn!(call_sid, error = %e, "Dropping unencodable agent audio");
                            continue;
                        }
                    };

                    let envelope = match MediaEnvelope::new(stream_sid, payload).to_json() {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            warn!(call_sid, error = %e, "Failed to serialize media envelope");
                            continue;
                        }
                    };

                    if let Err(error) = self.telephony_tx.send(Frame::Text(envelope)).await {
                        break LoopExit::SendFailed {
                            side: Side::Telephony,
                            error,
                        };
                    }
                    forwarded += 1;
                }
                Frame::Text(text) => observe_agent_text(call_sid, &text),
                Frame::Close(reason) => {
                    break LoopExit::PeerClosed {
                        side: Side::Agent,
                        reason,
                    };
                }
            }
        };

        self.link.set_status(LinkStatus::Closed);

        // Agent loss while the caller is still connected is an error for the caller
        let close = if self.view.telephony_status().is_open() {
            CloseReason::internal_error(AGENT_CLOSED_REASON)
        } else {
            CloseReason::normal(CLEANUP_REASON)
        };
        self.telephony_tx.close_with(close).await;

        info!(call_sid, frames = forwarded, exit = ?exit, "Agent to telephony loop finished");
        exit
    }
}

fn observe_agent_text(call_sid: &str, text: &str) {
    match AgentEvent::parse(text) {
        Ok(AgentEvent::ConversationText { role, content }) => {
            info!(call_sid, %role, %content, "Conversation text");
        }
        Ok(AgentEvent::Error { description, code }) => {
            warn!(call_sid, ?description, ?code, "Voice agent reported an error");
        }
        Ok(AgentEvent::Warning { description, code }) => {
            warn!(call_sid, ?description, ?code, "Voice agent warning");
        }
        Ok(AgentEvent::Welcome { session_id }) => {
            info!(call_sid, ?session_id, "Voice agent session opened");
        }
        Ok(event) => debug!(call_sid, ?event, "Voice agent event"),
        Err(_) => warn!(call_sid, text, "Voice agent sent a non-JSON text frame"),
    }
}

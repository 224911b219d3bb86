use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::{RelayError, RelayResult};

// =============================================================================
// Inbound Envelopes
// =============================================================================

/// Events received on a Twilio media stream.
///
/// Unrecognized event names parse as [`TelephonyEvent::Unknown`]; a known
/// event with missing required fields fails to parse. Only `media.payload`
/// and `mark.name` are required. Metadata fields of an unexpected type read
/// as absent so they never cost a `start` or `stop`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    Connected {
        #[serde(default, deserialize_with = "lenient")]
        protocol: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        version: Option<String>,
    },
    Start(StartEvent),
    Media {
        media: MediaPayload,
    },
    Stop(StopEvent),
    Mark {
        mark: MarkPayload,
    },
    #[serde(other)]
    Unknown,
}

impl TelephonyEvent {
    pub fn parse(text: &str) -> RelayResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| RelayError::Decode(format!("invalid telephony envelope: {e}")))
    }
}

/// Reads a field as `T`, or `None` when it has another JSON type.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub stream_sid: Option<String>,
    #[serde(default)]
    pub sequence_number: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub start: Option<StartMetadata>,
}

impl StartEvent {
    /// Stream id from the envelope, falling back to the nested metadata.
    pub fn stream_sid(&self) -> Option<&str> {
        let top = self.stream_sid.as_deref().filter(|sid| !sid.is_empty());
        top.or_else(|| self.start.as_ref()?.stream_sid.as_deref())
            .filter(|sid| !sid.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    #[serde(default, deserialize_with = "lenient")]
    pub stream_sid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub call_sid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub account_sid: Option<String>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub tracks: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub media_format: Option<MediaFormat>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub custom_parameters: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    #[serde(default, deserialize_with = "lenient")]
    pub encoding: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sample_rate: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub channels: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MediaPayload {
    pub payload: String,
    #[serde(default, deserialize_with = "lenient")]
    pub track: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub chunk: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<String>,
}

/// End of the stream. Always honoured, whatever else the envelope carries.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StopEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub stream_sid: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MarkPayload {
    pub name: String,
}

// =============================================================================
// Outbound Envelopes
// =============================================================================

/// Agent audio sent back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct MediaEnvelope {
    event: &'static str,
    #[serde(rename = "streamSid")]
    stream_sid: String,
    media: OutboundMedia,
}

#[derive(Debug, Clone, Serialize)]
struct OutboundMedia {
    payload: String,
}

impl MediaEnvelope {
    pub fn new(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event: "media",
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: payload.into(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

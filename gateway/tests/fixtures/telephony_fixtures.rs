//! Twilio media stream envelopes as sent by the provider.

use base64::{Engine, prelude::BASE64_STANDARD};
use serde_json::{Value, json};

pub fn connected_event() -> String {
    json!({"event": "connected", "protocol": "Call", "version": "1.0.0"}).to_string()
}

pub fn start_event(stream_sid: &str, call_sid: &str) -> String {
    json!({
        "event": "start",
        "sequenceNumber": "1",
        "streamSid": stream_sid,
        "start": {
            "streamSid": stream_sid,
            "accountSid": "AC-test",
            "callSid": call_sid,
            "tracks": ["inbound"],
            "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1},
            "customParameters": {}
        }
    })
    .to_string()
}

pub fn media_event(stream_sid: &str, chunk: u32, mulaw: &[u8]) -> String {
    json!({
        "event": "media",
        "sequenceNumber": (chunk + 1).to_string(),
        "streamSid": stream_sid,
        "media": {
            "track": "inbound",
            "chunk": chunk.to_string(),
            "timestamp": (chunk * 20).to_string(),
            "payload": BASE64_STANDARD.encode(mulaw)
        }
    })
    .to_string()
}

pub fn mark_event(stream_sid: &str, name: &str) -> String {
    json!({"event": "mark", "streamSid": stream_sid, "mark": {"name": name}}).to_string()
}

pub fn stop_event(stream_sid: &str, call_sid: &str) -> String {
    json!({
        "event": "stop",
        "streamSid": stream_sid,
        "stop": {"accountSid": "AC-test", "callSid": call_sid}
    })
    .to_string()
}

/// Decode the payload of an outbound `media` envelope.
pub fn decode_outbound_media(text: &str) -> Option<(String, Vec<u8>)> {
    let value: Value = serde_json::from_str(text).ok()?;
    if value["event"] != "media" {
        return None;
    }
    let stream_sid = value["streamSid"].as_str()?.to_string();
    let payload = BASE64_STANDARD
        .decode(value["media"]["payload"].as_str()?)
        .ok()?;
    Some((stream_sid, payload))
}

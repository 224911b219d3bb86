//! Base64 encoding of mu-law media payloads.

use base64::{Engine, prelude::BASE64_STANDARD};

use crate::core::audio::{AudioEncoding, AudioFrame, CodecError, CodecResult};

/// Decode a media payload into a mu-law frame.
pub fn decode_media_payload(payload: &str) -> CodecResult<AudioFrame> {
    BASE64_STANDARD
        .decode(payload)
        .map(AudioFrame::mulaw)
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))
}

/// Encode a mu-law frame as a media payload.
pub fn encode_media_payload(frame: &AudioFrame) -> CodecResult<String> {
    if frame.encoding() != AudioEncoding::Mulaw {
        return Err(CodecError::UnexpectedEncoding {
            expected: AudioEncoding::Mulaw,
            actual: frame.encoding(),
        });
    }
    Ok(BASE64_STANDARD.encode(frame.data()))
}

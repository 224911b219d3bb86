//! Audio codec and resampling primitives.
//!
//! Everything in this module is pure: no I/O, no shared state. The relay
//! calls these functions once per frame on the forwarding path, so they are
//! cheap enough to run inline and safe to move onto a blocking pool.
//!
//! Three representations are in play:
//! - G.711 mu-law at 8 kHz (telephony media)
//! - 16-bit little-endian linear PCM at the agent input rate (16 kHz)
//! - 16-bit little-endian linear PCM at the agent output rate (24 kHz)

mod frame;
pub mod mulaw;
pub mod resample;

pub use frame::{AudioEncoding, AudioFrame};
pub use resample::resample_linear;

use thiserror::Error;

/// Sample rate of companded telephony audio.
pub const TELEPHONY_SAMPLE_RATE: u32 = 8_000;

/// Errors raised while decoding or converting audio.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),
    #[error("Linear PCM buffer has odd length {0}")]
    OddByteLength(usize),
    #[error("Invalid sample rate conversion {from} Hz -> {to} Hz")]
    InvalidSampleRate { from: u32, to: u32 },
    #[error("Expected {expected} audio, got {actual}")]
    UnexpectedEncoding {
        expected: AudioEncoding,
        actual: AudioEncoding,
    },
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Interpret little-endian 16-bit PCM bytes as samples.
///
/// Reads byte pairs directly, so the input needs no particular alignment.
pub fn pcm_bytes_to_samples(bytes: &[u8]) -> CodecResult<Vec<i16>> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::OddByteLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Serialize samples as little-endian 16-bit PCM bytes.
pub fn samples_to_pcm_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    CodecError, CodecResult, TELEPHONY_SAMPLE_RATE, mulaw, pcm_bytes_to_samples, resample_linear,
    samples_to_pcm_bytes,
};

/// Sample encoding carried by an [`AudioFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// G.711 mu-law, one byte per sample, always 8 kHz
    Mulaw,
    /// Signed 16-bit little-endian PCM
    Linear16,
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioEncoding::Mulaw => write!(f, "mulaw"),
            AudioEncoding::Linear16 => write!(f, "linear16"),
        }
    }
}

/// A buffer of raw audio tagged with its encoding and sample rate.
///
/// Conversions consume or borrow the frame and return a new one; a frame is
/// never shared between pipeline stages. Empty frames are valid and convert
/// to empty frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    encoding: AudioEncoding,
    sample_rate: u32,
    data: Bytes,
}

impl AudioFrame {
    /// Mu-law audio at the telephony rate
    pub fn mulaw(data: impl Into<Bytes>) -> Self {
        Self {
            encoding: AudioEncoding::Mulaw,
            sample_rate: TELEPHONY_SAMPLE_RATE,
            data: data.into(),
        }
    }

    /// Linear PCM bytes at `sample_rate`
    pub fn linear16(data: impl Into<Bytes>, sample_rate: u32) -> Self {
        Self {
            encoding: AudioEncoding::Linear16,
            sample_rate,
            data: data.into(),
        }
    }

    pub fn encoding(&self) -> AudioEncoding {
        self.encoding
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of samples, counting a trailing half sample as none.
    pub fn sample_count(&self) -> usize {
        match self.encoding {
            AudioEncoding::Mulaw => self.data.len(),
            AudioEncoding::Linear16 => self.data.len() / 2,
        }
    }

    /// Expand to linear PCM. Linear frames are returned as-is.
    pub fn to_linear16(&self) -> CodecResult<AudioFrame> {
        match self.encoding {
            AudioEncoding::Linear16 => {
                if self.data.len() % 2 != 0 {
                    return Err(CodecError::OddByteLength(self.data.len()));
                }
                Ok(self.clone())
            }
            AudioEncoding::Mulaw => {
                let samples = mulaw::decode(&self.data);
                Ok(AudioFrame::linear16(
                    samples_to_pcm_bytes(&samples),
                    self.sample_rate,
                ))
            }
        }
    }

    /// Resample linear PCM to `target_rate`.
    pub fn resample(&self, target_rate: u32) -> CodecResult<AudioFrame> {
        self.expect_encoding(AudioEncoding::Linear16)?;
        if self.sample_rate == target_rate {
            return Ok(self.clone());
        }
        let samples = pcm_bytes_to_samples(&self.data)?;
        let resampled = resample_linear(&samples, self.sample_rate, target_rate)?;
        Ok(AudioFrame::linear16(
            samples_to_pcm_bytes(&resampled),
            target_rate,
        ))
    }

    /// Resample to 8 kHz if needed and compand to mu-law.
    ///
    /// Fails without producing any bytes when the PCM cannot be resampled.
    pub fn to_mulaw(&self) -> CodecResult<AudioFrame> {
        match self.encoding {
            AudioEncoding::Mulaw => Ok(self.clone()),
            AudioEncoding::Linear16 => {
                let samples = pcm_bytes_to_samples(&self.data)?;
                let at_telephony_rate =
                    resample_linear(&samples, self.sample_rate, TELEPHONY_SAMPLE_RATE)?;
                Ok(AudioFrame::mulaw(mulaw::encode(&at_telephony_rate)))
            }
        }
    }

    fn expect_encoding(&self, expected: AudioEncoding) -> CodecResult<()> {
        if self.encoding != expected {
            return Err(CodecError::UnexpectedEncoding {
                expected,
                actual: self.encoding,
            });
        }
        Ok(())
    }
}

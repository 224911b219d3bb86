//! Audio Test Fixtures
//!
//! Generated audio keeps tests reproducible without fixture files.
//!
//! Audio formats:
//! - Telephony: 8kHz mu-law, one byte per sample
//! - Agent: 16-bit signed little-endian PCM, mono

use std::f32::consts::PI;

use callbridge_gateway::core::audio::mulaw;

/// Telephony sample rate
pub const TELEPHONY_RATE: u32 = 8000;

/// One 20 ms telephony packet at 8kHz
pub const TELEPHONY_CHUNK: usize = 160;

/// Generate a sine wave tone at `sample_rate`
pub fn generate_sine_wave(
    duration_samples: usize,
    frequency: f32,
    amplitude: f32,
    sample_rate: u32,
) -> Vec<i16> {
    let max_amplitude = amplitude * i16::MAX as f32;
    let angular_freq = 2.0 * PI * frequency / sample_rate as f32;

    (0..duration_samples)
        .map(|i| ((angular_freq * i as f32).sin() * max_amplitude) as i16)
        .collect()
}

/// Generate silence (zeros)
pub fn generate_silence(duration_samples: usize) -> Vec<i16> {
    vec![0i16; duration_samples]
}

/// Convert samples to little-endian PCM bytes
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Convert little-endian PCM bytes to samples
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// A 20 ms mu-law packet of a 440 Hz tone, as the phone network would send it
pub fn mulaw_tone_chunk() -> Vec<u8> {
    mulaw::encode(&generate_sine_wave(
        TELEPHONY_CHUNK,
        440.0,
        0.5,
        TELEPHONY_RATE,
    ))
}

/// Split mu-law audio into 20 ms packets
pub fn mulaw_chunks(samples: &[i16]) -> Vec<Vec<u8>> {
    mulaw::encode(samples)
        .chunks(TELEPHONY_CHUNK)
        .map(<[u8]>::to_vec)
        .collect()
}

/// Count sign changes, a cheap pitch estimate
pub fn zero_crossings(samples: &[i16]) -> usize {
    samples
        .windows(2)
        .filter(|w| (w[0] >= 0) != (w[1] >= 0))
        .count()
}

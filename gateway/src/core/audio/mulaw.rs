//! G.711 mu-law companding.
//!
//! Every byte is a valid mu-law code, so decoding cannot fail. Encoding
//! clips to the G.711 range before companding.

const BIAS: i32 = 0x84;
const CLIP: i32 = 32_635;

/// Expand one mu-law byte to a linear 16-bit sample.
#[inline]
pub fn decode_sample(byte: u8) -> i16 {
    let code = !byte;
    let sign = code & 0x80;
    let exponent = (code >> 4) & 0x07;
    let mantissa = code & 0x0F;

    let magnitude = ((((mantissa as i32) << 3) + BIAS) << exponent) - BIAS;
    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Compress one linear 16-bit sample to a mu-law byte.
#[inline]
pub fn encode_sample(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign: u8 = if magnitude < 0 {
        magnitude = -magnitude;
        0x80
    } else {
        0x00
    };

    magnitude = magnitude.min(CLIP) + BIAS;

    // magnitude is in [0x84, 0x7FFF], so the top set bit sits between 7 and 14
    let top_bit = 31 - (magnitude as u32).leading_zeros();
    let exponent = (top_bit - 7) as u8;
    let mantissa = ((magnitude >> (exponent + 3)) & 0x0F) as u8;

    !(sign | (exponent << 4) | mantissa)
}

/// Expand a mu-law buffer into linear samples, one sample per input byte.
pub fn decode(bytes: &[u8]) -> Vec<i16> {
    bytes.iter().map(|&b| decode_sample(b)).collect()
}

/// Compress linear samples into mu-law, one byte per input sample.
pub fn encode(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| encode_sample(s)).collect()
}

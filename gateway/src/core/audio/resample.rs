//! Linear-interpolation sample rate conversion.

use super::{CodecError, CodecResult};

/// Number of output samples produced for `len` input samples.
///
/// Down-sampling a non-empty buffer never yields an empty one.
pub fn target_len(len: usize, from_rate: u32, to_rate: u32) -> usize {
    if len == 0 {
        return 0;
    }
    let scaled = (len as u64 * to_rate as u64) / from_rate.max(1) as u64;
    (scaled as usize).max(1)
}

/// Resample `samples` from `from_rate` to `to_rate` by linear interpolation.
///
/// Output sample `i` is taken at input position `i * (n - 1) / (m - 1)`, so the
/// first and last input samples are always preserved. Equal rates return the
/// input unchanged.
pub fn resample_linear(samples: &[i16], from_rate: u32, to_rate: u32) -> CodecResult<Vec<i16>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(CodecError::InvalidSampleRate {
            from: from_rate,
            to: to_rate,
        });
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let out_len = target_len(samples.len(), from_rate, to_rate);
    if out_len == 1 {
        return Ok(vec![samples[0]]);
    }

    let last = samples.len() - 1;
    let step = last as f64 / (out_len - 1) as f64;

    let resampled = (0..out_len)
        .map(|i| {
            let position = i as f64 * step;
            let index = (position.floor() as usize).min(last);
            let next = (index + 1).min(last);
            let fraction = position - index as f64;

            let a = samples[index] as f64;
            let b = samples[next] as f64;
            (a + (b - a) * fraction).round() as i16
        })
        .collect();

    Ok(resampled)
}

//! High-quality resampling using rubato
//!
//! FFT-based resampling with proper anti-aliasing, processing all channels
//! of a buffer together. Falls back to linear interpolation only if rubato
//! fails to initialize or process.

use crate::audio::AudioBuffer;
use rubato::{FftFixedInOut, Resampler};
use tracing::debug;

/// Rubato works on fixed-size chunks; 1024 frames balances quality and
/// memory for offline processing.
const CHUNK_SIZE: usize = 1024;

/// Resample a buffer to `to_rate`, preserving channel count.
pub fn resample(buf: &AudioBuffer, to_rate: u32) -> AudioBuffer {
    let from_rate = buf.sample_rate();
    if from_rate == to_rate || buf.is_empty() {
        return buf.clone();
    }

    let num_channels = buf.num_channels();
    let mut resampler = match FftFixedInOut::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        num_channels,
    ) {
        Ok(r) => r,
        Err(e) => {
            debug!("Rubato initialization failed ({}), using linear fallback", e);
            return linear_fallback(buf, to_rate);
        }
    };

    let input_frames = resampler.input_frames_next();
    let output_frames = resampler.output_frames_next();
    let total_samples = buf.num_samples();
    let ratio = to_rate as f64 / from_rate as f64;
    let estimated = (total_samples as f64 * ratio).ceil() as usize;

    let mut out: Vec<Vec<f32>> = vec![Vec::with_capacity(estimated); num_channels];
    let mut pos = 0;

    while pos < total_samples {
        let end = (pos + input_frames).min(total_samples);

        // Pad the final chunk with silence to the fixed input size
        let chunk: Vec<Vec<f32>> = buf
            .channels()
            .iter()
            .map(|ch| {
                let mut c = ch[pos..end].to_vec();
                c.resize(input_frames, 0.0);
                c
            })
            .collect();

        match resampler.process(&chunk, None) {
            Ok(resampled) => {
                // Only keep output frames that correspond to real input
                let valid = if pos + input_frames > total_samples {
                    let input_valid = total_samples - pos;
                    ((input_valid as f64 * ratio).ceil() as usize).min(output_frames)
                } else {
                    output_frames
                };

                for (dst, src) in out.iter_mut().zip(resampled.iter()) {
                    let take = valid.min(src.len());
                    dst.extend_from_slice(&src[..take]);
                }
            }
            Err(e) => {
                debug!("Rubato processing error ({}), linear fallback for remainder", e);
                let remaining = AudioBuffer::new(
                    buf.channels().iter().map(|ch| ch[pos..].to_vec()).collect(),
                    from_rate,
                );
                let tail = linear_fallback(&remaining, to_rate);
                for (dst, src) in out.iter_mut().zip(tail.channels().iter()) {
                    dst.extend_from_slice(src);
                }
                break;
            }
        }

        pos += input_frames;
    }

    AudioBuffer::new(out, to_rate)
}

/// Linear-interpolation resampler used only when rubato is unusable.
fn linear_fallback(buf: &AudioBuffer, to_rate: u32) -> AudioBuffer {
    let from_rate = buf.sample_rate();
    if from_rate == to_rate {
        return buf.clone();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let channels = buf
        .channels()
        .iter()
        .map(|samples| {
            let output_len = (samples.len() as f64 / ratio) as usize;
            let mut out = Vec::with_capacity(output_len);
            for i in 0..output_len {
                let src_pos = i as f64 * ratio;
                let src_idx = src_pos as usize;
                let frac = (src_pos - src_idx as f64) as f32;

                let sample = if src_idx + 1 < samples.len() {
                    samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
                } else {
                    samples[src_idx.min(samples.len().saturating_sub(1))]
                };
                out.push(sample);
            }
            out
        })
        .collect();

    AudioBuffer::new(channels, to_rate)
}

//! Level normalization around the separation model
//!
//! The model is fed a signal rescaled to canonical statistics: zero mean
//! and unit standard deviation of the mono mixdown. The statistics are
//! retained so the transform can be exactly inverted after separation —
//! an incorrect inverse silently corrupts output loudness without raising
//! any error, so `denormalize` must be the exact algebraic inverse of
//! `normalize` for any context the latter produces.

use crate::audio::AudioBuffer;

/// Statistics computed from the mono mixdown immediately before inference.
///
/// Owned by the pipeline run that created it; never reuse a context across
/// different input files.
#[derive(Debug, Clone, Copy)]
pub struct NormalizationContext {
    mean: f64,
    std: f64,
}

impl NormalizationContext {
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std(&self) -> f64 {
        self.std
    }
}

/// Rescale a buffer to zero mean / unit std of its mono mixdown.
///
/// If the mixdown has zero variance (silence or DC-only input) the buffer
/// is returned unchanged with `std := 1` and `mean := 0` recorded, so no
/// NaN/Inf can enter the pipeline and the inverse is still exact.
pub fn normalize(buffer: &AudioBuffer) -> (AudioBuffer, NormalizationContext) {
    let reference = buffer.mono_mix();
    if reference.is_empty() {
        return (
            buffer.clone(),
            NormalizationContext { mean: 0.0, std: 1.0 },
        );
    }

    let n = reference.len() as f64;
    let mean: f64 = reference.iter().map(|&s| s as f64).sum::<f64>() / n;
    let variance: f64 = reference
        .iter()
        .map(|&s| {
            let d = s as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let std = variance.sqrt();

    if std <= 0.0 || !std.is_finite() {
        return (
            buffer.clone(),
            NormalizationContext { mean: 0.0, std: 1.0 },
        );
    }

    let ctx = NormalizationContext { mean, std };
    let normalized = buffer.map_samples(|s| ((s as f64 - mean) / std) as f32);
    (normalized, ctx)
}

/// Exact inverse of [`normalize`]: `x * std + mean`.
pub fn denormalize(buffer: &AudioBuffer, ctx: &NormalizationContext) -> AudioBuffer {
    buffer.map_samples(|s| (s as f64 * ctx.std + ctx.mean) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_buffer(amplitude: f32, offset: f32) -> AudioBuffer {
        use std::f32::consts::PI;
        let left: Vec<f32> = (0..4410)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / 44100.0).sin() * amplitude + offset)
            .collect();
        let right: Vec<f32> = (0..4410)
            .map(|i| (2.0 * PI * 330.0 * i as f32 / 44100.0).sin() * amplitude + offset)
            .collect();
        AudioBuffer::new(vec![left, right], 44100)
    }

    #[test]
    fn test_round_trip_reconstructs_input() {
        let buffer = sine_buffer(0.5, 0.1);
        let (normalized, ctx) = normalize(&buffer);
        let restored = denormalize(&normalized, &ctx);

        for (orig, rest) in buffer.channels().iter().zip(restored.channels().iter()) {
            for (&a, &b) in orig.iter().zip(rest.iter()) {
                assert!((a - b).abs() < 1e-5, "round trip drift: {} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_normalized_statistics_are_canonical() {
        let buffer = sine_buffer(0.3, 0.2);
        let (normalized, _) = normalize(&buffer);
        let mix = normalized.mono_mix();

        let n = mix.len() as f64;
        let mean: f64 = mix.iter().map(|&s| s as f64).sum::<f64>() / n;
        let var: f64 = mix
            .iter()
            .map(|&s| {
                let d = s as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        assert!(mean.abs() < 1e-4, "mean {} should be ~0", mean);
        assert!((var.sqrt() - 1.0).abs() < 1e-3, "std {} should be ~1", var.sqrt());
    }

    #[test]
    fn test_silence_is_safe() {
        let buffer = AudioBuffer::silence(2, 1000, 44100);
        let (normalized, ctx) = normalize(&buffer);

        assert!((ctx.std() - 1.0).abs() < f64::EPSILON);
        assert!(normalized
            .channels()
            .iter()
            .flat_map(|c| c.iter())
            .all(|s| s.is_finite() && *s == 0.0));

        let restored = denormalize(&normalized, &ctx);
        assert!(restored
            .channels()
            .iter()
            .flat_map(|c| c.iter())
            .all(|&s| s == 0.0));
    }

    #[test]
    fn test_dc_only_input_produces_no_nan() {
        let buffer = AudioBuffer::new(vec![vec![0.5; 1000], vec![0.5; 1000]], 44100);
        let (normalized, ctx) = normalize(&buffer);

        assert!((ctx.std() - 1.0).abs() < f64::EPSILON);
        assert!(normalized
            .channels()
            .iter()
            .flat_map(|c| c.iter())
            .all(|s| s.is_finite()));

        // Unchanged in, unchanged out
        let restored = denormalize(&normalized, &ctx);
        assert!((restored.channel(0)[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_shape_preserved() {
        let buffer = sine_buffer(0.4, 0.0);
        let (normalized, _) = normalize(&buffer);
        assert_eq!(normalized.num_channels(), buffer.num_channels());
        assert_eq!(normalized.num_samples(), buffer.num_samples());
        assert_eq!(normalized.sample_rate(), buffer.sample_rate());
    }
}

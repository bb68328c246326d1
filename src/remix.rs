//! Remix: sum selected sources, restore levels, keep headroom
//!
//! Estimates come out of the model in the normalized domain, so the sum of
//! the selected sources is denormalized with the context captured before
//! inference, then scaled to leave clipping headroom.

use crate::audio::AudioBuffer;
use crate::error::{Result, UnmixError};
use crate::separation::{denormalize, NormalizationContext, RemixSpec, SourceEstimates};
use tracing::debug;

/// Target peak after remixing. Anything under full scale survives the
/// integer quantization of every output format without clipping.
pub const TARGET_PEAK: f32 = 0.95;

/// Mix the selected sources at unit gain, undo normalization, and scale
/// the result so its peak lands exactly at [`TARGET_PEAK`].
///
/// The scaling applies whenever the peak is nonzero, attenuating loud
/// mixes and amplifying quiet ones alike. An all-zero selection (e.g.
/// silent input) passes through unscaled. An empty selection is a
/// configuration error.
pub fn remix(
    estimates: &SourceEstimates,
    spec: &RemixSpec,
    ctx: &NormalizationContext,
) -> Result<AudioBuffer> {
    if spec.is_empty() {
        return Err(UnmixError::Config(
            "remix selection is empty; keep at least one source".to_string(),
        ));
    }

    let first = estimates.get(spec.sources()[0]);
    let num_channels = first.num_channels();
    let num_samples = first.num_samples();
    let sample_rate = first.sample_rate();

    let mut channels = vec![vec![0.0f32; num_samples]; num_channels];
    for &source in spec.sources() {
        let estimate = estimates.get(source);
        for (acc, src) in channels.iter_mut().zip(estimate.channels().iter()) {
            for (a, &s) in acc.iter_mut().zip(src.iter()) {
                *a += s;
            }
        }
    }

    let summed = AudioBuffer::new(channels, sample_rate);
    let restored = denormalize(&summed, ctx);

    let peak = restored.peak();
    if peak <= 0.0 {
        debug!(selection = %spec, "remix is silent, skipping peak scaling");
        return Ok(restored);
    }

    let gain = TARGET_PEAK / peak;
    debug!(selection = %spec, peak, gain, "scaling remix to target peak");
    Ok(restored.map_samples(|s| s * gain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::separation::normalize;
    use crate::separation::Source;

    fn sine(amplitude: f32, freq: f32) -> Vec<f32> {
        use std::f32::consts::PI;
        (0..4410)
            .map(|i| (2.0 * PI * freq * i as f32 / 44100.0).sin() * amplitude)
            .collect()
    }

    fn estimates_with_vocals(vocals: AudioBuffer) -> SourceEstimates {
        let zero = AudioBuffer::silence(
            vocals.num_channels(),
            vocals.num_samples(),
            vocals.sample_rate(),
        );
        SourceEstimates::new(zero.clone(), zero.clone(), zero, vocals)
    }

    #[test]
    fn test_peak_lands_exactly_at_target() {
        let buffer = AudioBuffer::new(vec![sine(0.5, 440.0), sine(0.5, 330.0)], 44100);
        let (normalized, ctx) = normalize(&buffer);
        let estimates = estimates_with_vocals(normalized);

        let out = remix(&estimates, &RemixSpec::vocals(), &ctx).unwrap();
        assert!((out.peak() - TARGET_PEAK).abs() < 1e-4, "peak {}", out.peak());
    }

    #[test]
    fn test_quiet_mix_is_amplified() {
        // Peak 0.5 in, peak 0.95 out: gain of 1.9
        let buffer = AudioBuffer::new(vec![sine(0.5, 440.0)], 44100);
        let (normalized, ctx) = normalize(&buffer);
        let estimates = estimates_with_vocals(normalized);

        let out = remix(&estimates, &RemixSpec::vocals(), &ctx).unwrap();
        let input_peak = buffer.peak();
        assert!(input_peak < 0.51);
        assert!(out.peak() > input_peak, "quiet mix should be amplified");
    }

    #[test]
    fn test_silent_selection_stays_silent() {
        // Silence records an identity context, so zero estimates stay zero
        // and the peak-scaling step is skipped rather than dividing by zero.
        let (_, ctx) = normalize(&AudioBuffer::silence(2, 4410, 44100));
        let zero = AudioBuffer::silence(2, 4410, 44100);
        let estimates = SourceEstimates::new(zero.clone(), zero.clone(), zero.clone(), zero);

        let out = remix(&estimates, &RemixSpec::vocals(), &ctx).unwrap();
        assert!(out.peak() == 0.0);
    }

    #[test]
    fn test_empty_selection_is_config_error() {
        let buffer = AudioBuffer::new(vec![sine(0.5, 440.0)], 44100);
        let (normalized, ctx) = normalize(&buffer);
        let estimates = estimates_with_vocals(normalized);

        let err = remix(&estimates, &RemixSpec::new([]), &ctx).unwrap_err();
        assert!(matches!(err, UnmixError::Config(_)));
    }

    #[test]
    fn test_selection_excludes_unselected_sources() {
        // Vocals carry a distinct signal; instrumental selection must not
        // contain it.
        let vocals = AudioBuffer::new(vec![sine(0.8, 440.0)], 44100);
        let zero = AudioBuffer::silence(1, 4410, 44100);
        let estimates =
            SourceEstimates::new(zero.clone(), zero.clone(), zero.clone(), vocals);
        let (_, ctx) = normalize(&AudioBuffer::silence(1, 4410, 44100));

        let out = remix(&estimates, &RemixSpec::instrumental(), &ctx).unwrap();
        assert!(out.peak() < 1e-6, "instrumental should exclude vocals");
    }

    #[test]
    fn test_multiple_sources_are_summed() {
        let a = AudioBuffer::new(vec![vec![0.1; 100]], 44100);
        let b = AudioBuffer::new(vec![vec![0.2; 100]], 44100);
        let zero = AudioBuffer::silence(1, 100, 44100);
        let estimates = SourceEstimates::new(a, b, zero.clone(), zero);

        // Identity context so sums are directly observable before scaling
        let buffer = AudioBuffer::silence(1, 100, 44100);
        let (_, ctx) = normalize(&buffer);

        let out = remix(
            &estimates,
            &RemixSpec::new([Source::Drums, Source::Bass]),
            &ctx,
        )
        .unwrap();
        // Sum is a constant 0.3, scaled to the target peak
        assert!((out.peak() - TARGET_PEAK).abs() < 1e-5);
        for &s in out.channel(0) {
            assert!((s - TARGET_PEAK).abs() < 1e-5);
        }
    }
}

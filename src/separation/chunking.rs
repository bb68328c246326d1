//! Segmenting and overlap-add reassembly
//!
//! HTDemucs-style models accept a bounded segment length, so the ONNX
//! adapter splits its input into overlapping segments, runs inference on
//! each, and reassembles the per-source estimates with a linear crossfade.
//! This lives inside the model adapter; the rest of the pipeline sees a
//! single `separate` call.

use crate::audio::AudioBuffer;
use crate::separation::model::ModelConfig;
use crate::separation::source::{Source, SourceEstimates};

/// Segment sizing for a model variant
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// Maximum samples per segment
    pub segment_samples: usize,
    /// Overlap samples between segments
    pub overlap_samples: usize,
    /// Sample rate
    pub sample_rate: u32,
}

impl SegmentConfig {
    pub fn for_model(config: &ModelConfig) -> Self {
        let sample_rate = config.spec.sample_rate;
        Self {
            segment_samples: (config.segment_seconds * sample_rate as f32) as usize,
            overlap_samples: (config.overlap_seconds * sample_rate as f32) as usize,
            sample_rate,
        }
    }

    /// Hop between segment starts
    pub fn stride(&self) -> usize {
        self.segment_samples.saturating_sub(self.overlap_samples)
    }
}

/// A slice of the input ready for inference
#[derive(Debug, Clone)]
pub struct Segment {
    pub index: usize,
    pub start_sample: usize,
    pub audio: AudioBuffer,
}

/// Per-source estimates for one segment
#[derive(Debug, Clone)]
pub struct SeparatedSegment {
    pub index: usize,
    pub start_sample: usize,
    pub estimates: SourceEstimates,
}

/// Split a buffer into overlapping segments.
pub fn split(buffer: &AudioBuffer, config: &SegmentConfig) -> Vec<Segment> {
    let total_samples = buffer.num_samples();
    let stride = config.stride();

    // stride == 0 (overlap >= segment) cannot advance; treat it like the
    // short-input case rather than looping forever.
    if total_samples <= config.segment_samples || stride == 0 {
        return vec![Segment {
            index: 0,
            start_sample: 0,
            audio: buffer.clone(),
        }];
    }

    let mut segments = Vec::new();
    let mut start = 0;
    let mut index = 0;

    while start < total_samples {
        let end = (start + config.segment_samples).min(total_samples);
        let channels: Vec<Vec<f32>> = buffer
            .channels()
            .iter()
            .map(|ch| ch[start..end].to_vec())
            .collect();

        segments.push(Segment {
            index,
            start_sample: start,
            audio: AudioBuffer::new(channels, config.sample_rate),
        });

        start += stride;
        index += 1;

        // Avoid a tiny final segment; saturate since `start` may already
        // be past the end of the buffer.
        if total_samples.saturating_sub(start) < config.overlap_samples {
            break;
        }
    }

    segments
}

/// Reassemble separated segments with a linear crossfade in the overlaps.
pub fn overlap_add(
    segments: &[SeparatedSegment],
    config: &SegmentConfig,
    num_channels: usize,
    total_samples: usize,
) -> SourceEstimates {
    // [source][channel][sample] accumulators
    let mut out: [Vec<Vec<f32>>; 4] =
        std::array::from_fn(|_| vec![vec![0.0f32; total_samples]; num_channels]);
    let mut weight_sum = vec![0.0f32; total_samples];

    let last = segments.len().saturating_sub(1);
    for segment in segments {
        let seg_len = segment.estimates.get(Source::Drums).num_samples();
        let weights = crossfade_weights(
            seg_len,
            config.overlap_samples,
            segment.index == 0,
            segment.index == last,
        );

        for (source, estimate) in segment.estimates.iter() {
            let dst = &mut out[source.index()];
            for (ch, samples) in estimate.channels().iter().enumerate() {
                for (i, &s) in samples.iter().enumerate() {
                    let out_idx = segment.start_sample + i;
                    if out_idx < total_samples {
                        dst[ch][out_idx] += s * weights[i];
                    }
                }
            }
        }

        for (i, &w) in weights.iter().enumerate() {
            let out_idx = segment.start_sample + i;
            if out_idx < total_samples {
                weight_sum[out_idx] += w;
            }
        }
    }

    // Normalize by the accumulated weight
    for source_out in &mut out {
        for ch in source_out.iter_mut() {
            for (i, s) in ch.iter_mut().enumerate() {
                if weight_sum[i] > 1e-8 {
                    *s /= weight_sum[i];
                }
            }
        }
    }

    let [drums, bass, other, vocals] = out;
    SourceEstimates::new(
        AudioBuffer::new(drums, config.sample_rate),
        AudioBuffer::new(bass, config.sample_rate),
        AudioBuffer::new(other, config.sample_rate),
        AudioBuffer::new(vocals, config.sample_rate),
    )
}

/// Linear fade-in/fade-out ramps for one segment.
fn crossfade_weights(seg_len: usize, overlap: usize, is_first: bool, is_last: bool) -> Vec<f32> {
    let mut weights = vec![1.0f32; seg_len];

    if !is_first {
        let fade_len = overlap.min(seg_len);
        for (i, weight) in weights.iter_mut().take(fade_len).enumerate() {
            *weight = i as f32 / fade_len as f32;
        }
    }

    if !is_last {
        let fade_len = overlap.min(seg_len);
        let start = seg_len.saturating_sub(fade_len);
        for (i, weight) in weights[start..].iter_mut().enumerate() {
            *weight *= (fade_len - i) as f32 / fade_len as f32;
        }
    }

    weights
}

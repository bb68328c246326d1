//! Multichannel PCM buffer
//!
//! The canonical in-memory representation used by every pipeline stage:
//! `[channels, samples]` with all channels the same length. Mono audio is a
//! single channel row, never a bare sample vector. Buffers are immutable
//! once produced; transformations return new buffers.

/// Decoded multichannel audio samples
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// One sample vector per channel, all the same length
    channels: Vec<Vec<f32>>,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a buffer from per-channel sample vectors.
    ///
    /// Channels are truncated to the shortest one so the equal-length
    /// invariant always holds.
    pub fn new(mut channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let min_len = channels.iter().map(Vec::len).min().unwrap_or(0);
        for ch in &mut channels {
            ch.truncate(min_len);
        }
        Self {
            channels,
            sample_rate,
        }
    }

    /// Create a buffer of silence with the given shape
    pub fn silence(num_channels: usize, num_samples: usize, sample_rate: u32) -> Self {
        Self {
            channels: vec![vec![0.0; num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Build a buffer from interleaved frames `[L, R, L, R, ...]`
    pub fn from_interleaved(samples: &[f32], num_channels: usize, sample_rate: u32) -> Self {
        let num_channels = num_channels.max(1);
        let num_frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(num_frames); num_channels];

        for frame in samples.chunks_exact(num_channels) {
            for (ch, &sample) in channels.iter_mut().zip(frame.iter()) {
                ch.push(sample);
            }
        }

        Self {
            channels,
            sample_rate,
        }
    }

    /// Interleave channels into frames `[L, R, L, R, ...]`
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.num_channels() * self.num_samples());
        for i in 0..self.num_samples() {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn num_samples(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_channels() == 0 || self.num_samples() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate > 0 {
            self.num_samples() as f64 / self.sample_rate as f64
        } else {
            0.0
        }
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Average all channels into one reference signal.
    ///
    /// Used only for computing normalization statistics.
    pub fn mono_mix(&self) -> Vec<f32> {
        let num_channels = self.num_channels();
        if num_channels == 0 {
            return Vec::new();
        }
        if num_channels == 1 {
            return self.channels[0].clone();
        }

        let mut mix = vec![0.0f32; self.num_samples()];
        for ch in &self.channels {
            for (m, &s) in mix.iter_mut().zip(ch.iter()) {
                *m += s;
            }
        }
        let inv = 1.0 / num_channels as f32;
        for m in &mut mix {
            *m *= inv;
        }
        mix
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|ch| ch.iter())
            .fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }

    /// Apply a function to every sample, returning a new buffer
    pub fn map_samples(&self, f: impl Fn(f32) -> f32) -> Self {
        let channels = self
            .channels
            .iter()
            .map(|ch| ch.iter().map(|&s| f(s)).collect())
            .collect();
        Self {
            channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Adapt the channel count to what a consumer (e.g. the separation
    /// model) requires.
    ///
    /// Mono is duplicated up to the target count; a higher count is reduced
    /// to mono by averaging, or truncated to the leading channels when the
    /// target is multichannel.
    pub fn with_channels(&self, target: usize) -> Self {
        let current = self.num_channels();
        if current == target || target == 0 {
            return self.clone();
        }

        let channels: Vec<Vec<f32>> = if target == 1 {
            vec![self.mono_mix()]
        } else if current == 1 {
            vec![self.channels[0].clone(); target]
        } else if current > target {
            self.channels[..target].to_vec()
        } else {
            // Fewer channels than requested: repeat the last one
            let mut out = self.channels.clone();
            while out.len() < target {
                out.push(self.channels[current - 1].clone());
            }
            out
        };

        Self {
            channels,
            sample_rate: self.sample_rate,
        }
    }
}

//! Source classes and remix selection
//!
//! The separation model returns a fixed, ordered set of source classes.
//! They are represented as a closed enum rather than positional indices so
//! a reordering in the model output cannot silently land in the wrong stem.

use crate::audio::AudioBuffer;

/// A separable source class, in the model's output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    Drums,
    Bass,
    Other,
    Vocals,
}

impl Source {
    /// Model output order: `[drums, bass, other, vocals]`
    pub const ALL: [Source; 4] = [Source::Drums, Source::Bass, Source::Other, Source::Vocals];

    pub fn name(self) -> &'static str {
        match self {
            Source::Drums => "drums",
            Source::Bass => "bass",
            Source::Other => "other",
            Source::Vocals => "vocals",
        }
    }

    /// Position in the model's output tensor
    pub fn index(self) -> usize {
        match self {
            Source::Drums => 0,
            Source::Bass => 1,
            Source::Other => 2,
            Source::Vocals => 3,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One estimate buffer per source class.
///
/// Invariant (checked at the model boundary): every estimate shares the
/// sample rate, channel count, and sample count of the model input.
#[derive(Debug, Clone)]
pub struct SourceEstimates {
    drums: AudioBuffer,
    bass: AudioBuffer,
    other: AudioBuffer,
    vocals: AudioBuffer,
}

impl SourceEstimates {
    pub fn new(
        drums: AudioBuffer,
        bass: AudioBuffer,
        other: AudioBuffer,
        vocals: AudioBuffer,
    ) -> Self {
        Self {
            drums,
            bass,
            other,
            vocals,
        }
    }

    pub fn get(&self, source: Source) -> &AudioBuffer {
        match source {
            Source::Drums => &self.drums,
            Source::Bass => &self.bass,
            Source::Other => &self.other,
            Source::Vocals => &self.vocals,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Source, &AudioBuffer)> {
        Source::ALL.iter().map(move |&s| (s, self.get(s)))
    }

    /// Verify every estimate matches the shape the model input had.
    pub fn validate_against(
        &self,
        sample_rate: u32,
        num_channels: usize,
        num_samples: usize,
    ) -> Result<(), String> {
        for (source, buf) in self.iter() {
            if buf.sample_rate() != sample_rate {
                return Err(format!(
                    "{} estimate has sample rate {} (expected {})",
                    source,
                    buf.sample_rate(),
                    sample_rate
                ));
            }
            if buf.num_channels() != num_channels {
                return Err(format!(
                    "{} estimate has {} channels (expected {})",
                    source,
                    buf.num_channels(),
                    num_channels
                ));
            }
            if buf.num_samples() != num_samples {
                return Err(format!(
                    "{} estimate has {} samples (expected {})",
                    source,
                    buf.num_samples(),
                    num_samples
                ));
            }
        }
        Ok(())
    }
}

/// The set of source classes to keep when remixing, each at unit gain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemixSpec {
    keep: Vec<Source>,
}

impl RemixSpec {
    /// Build a spec from the given sources, deduplicated, in model order.
    pub fn new(sources: impl IntoIterator<Item = Source>) -> Self {
        let mut keep: Vec<Source> = Vec::new();
        for s in sources {
            if !keep.contains(&s) {
                keep.push(s);
            }
        }
        keep.sort_by_key(|s| s.index());
        Self { keep }
    }

    /// Vocal extraction: keep only the vocals estimate
    pub fn vocals() -> Self {
        Self::new([Source::Vocals])
    }

    /// Vocal removal: keep everything except vocals
    pub fn instrumental() -> Self {
        Self::new([Source::Drums, Source::Bass, Source::Other])
    }

    pub fn sources(&self) -> &[Source] {
        &self.keep
    }

    pub fn contains(&self, source: Source) -> bool {
        self.keep.contains(&source)
    }

    pub fn is_empty(&self) -> bool {
        self.keep.is_empty()
    }
}

impl std::fmt::Display for RemixSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.keep.iter().map(|s| s.name()).collect();
        f.write_str(&names.join("+"))
    }
}

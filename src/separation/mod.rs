//! Source separation: normalization, model invocation, and reassembly

pub mod chunking;
pub mod model;
pub mod normalize;
pub mod ort;
pub mod source;

pub use model::{ModelConfig, ModelSpec, HTDEMUCS, MODEL_PATH_ENV};
pub use normalize::{denormalize, normalize, NormalizationContext};
pub use ort::OrtSeparator;
pub use source::{RemixSpec, Source, SourceEstimates};

use crate::audio::AudioBuffer;
use crate::error::Result;

/// A separation backend.
///
/// Callers must query `sample_rate` and `channels` and adapt their input
/// before calling `separate`; the estimates come back in the same shape as
/// the input, in the normalized domain the input was in.
pub trait Separator {
    /// Sample rate the backend requires
    fn sample_rate(&self) -> u32;

    /// Channel count the backend requires
    fn channels(&self) -> usize;

    /// Split the input into one estimate per source class
    fn separate(&self, input: &AudioBuffer) -> Result<SourceEstimates>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

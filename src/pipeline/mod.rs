//! Pipeline orchestration
//!
//! One invocation runs: decode, adapt to the model's declared input shape,
//! normalize, separate, then remix and encode each requested selection.
//! Separation runs once per input regardless of how many remixes are
//! produced. Every stage error is fatal; there is no internal timeout, so
//! callers wanting an upper bound run the binary under their own watchdog.

use crate::audio::{self, AudioBuffer, EncodeOutcome, OutputTarget};
use crate::config::Settings;
use crate::error::{Result, UnmixError};
use crate::ffmpeg::FfmpegTool;
use crate::remix::remix;
use crate::separation::{normalize, OrtSeparator, Separator, HTDEMUCS};
use std::time::Instant;
use tracing::{debug, info};

/// One remix written to disk
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Output stem name ("vocals", "instrumental")
    pub name: &'static str,
    /// The sources that were kept, e.g. "drums+bass+other"
    pub selection: String,
    /// What the encoder actually wrote
    pub outcome: EncodeOutcome,
}

/// Summary of a completed run
#[derive(Debug)]
pub struct PipelineReport {
    pub artifacts: Vec<Artifact>,
    pub input_duration_secs: f64,
    pub elapsed_secs: f64,
}

impl PipelineReport {
    /// Artifacts whose requested format could not be honored
    pub fn substitutions(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(|a| a.outcome.substituted())
    }
}

/// Run the pipeline with the default ONNX backend.
pub fn run(settings: &Settings) -> Result<PipelineReport> {
    let separator = OrtSeparator::load(settings.model_path.as_deref(), HTDEMUCS)?;
    run_with(settings, &separator)
}

/// Run the pipeline with an explicit separation backend.
pub fn run_with(settings: &Settings, separator: &dyn Separator) -> Result<PipelineReport> {
    let started = Instant::now();

    let decoded = audio::decode(&settings.input)?;
    info!(
        input = %settings.input.display(),
        channels = decoded.num_channels(),
        sample_rate = decoded.sample_rate(),
        duration_secs = format!("{:.2}", decoded.duration_secs()),
        "decoded input"
    );
    let input_duration_secs = decoded.duration_secs();

    let adapted = adapt_to_model(&decoded, separator);
    let (normalized, ctx) = normalize(&adapted);
    debug!(mean = ctx.mean(), std = ctx.std(), "captured normalization context");

    info!(backend = separator.name(), "separating sources");
    let estimates = separator.separate(&normalized)?;
    estimates
        .validate_against(
            adapted.sample_rate(),
            adapted.num_channels(),
            adapted.num_samples(),
        )
        .map_err(UnmixError::separation)?;

    let ffmpeg = FfmpegTool::discover();

    let mut artifacts = Vec::new();
    for (name, spec) in settings.remix_jobs() {
        let mixed = remix(&estimates, &spec, &ctx)?;

        let target = OutputTarget {
            path: settings
                .output_dir
                .join(name)
                .with_extension(settings.format.extension()),
            format: settings.format,
            bitrate_kbps: settings.bitrate_kbps,
        };
        let outcome = audio::encode(&mixed, &target, ffmpeg.as_ref())?;
        info!(
            remix = name,
            selection = %spec,
            path = %outcome.path.display(),
            format = %outcome.format,
            "wrote remix"
        );

        artifacts.push(Artifact {
            name,
            selection: spec.to_string(),
            outcome,
        });
    }

    let elapsed_secs = started.elapsed().as_secs_f64();
    info!(
        artifacts = artifacts.len(),
        elapsed_secs = format!("{:.2}", elapsed_secs),
        "pipeline complete"
    );

    Ok(PipelineReport {
        artifacts,
        input_duration_secs,
        elapsed_secs,
    })
}

/// Bring the decoded audio to the channel count and sample rate the
/// backend declares.
fn adapt_to_model(decoded: &AudioBuffer, separator: &dyn Separator) -> AudioBuffer {
    let mut adapted = decoded.clone();

    let want_channels = separator.channels();
    if adapted.num_channels() != want_channels {
        debug!(
            from = adapted.num_channels(),
            to = want_channels,
            "adapting channel count"
        );
        adapted = adapted.with_channels(want_channels);
    }

    let want_rate = separator.sample_rate();
    if adapted.sample_rate() != want_rate {
        debug!(
            from = adapted.sample_rate(),
            to = want_rate,
            "resampling for model"
        );
        adapted = audio::resample(&adapted, want_rate);
    }

    adapted
}

//! ONNX Runtime separation backend
//!
//! Runs an HTDemucs model exported to ONNX. Input is segmented, each
//! segment is pushed through the session as a `(1, channels, samples)`
//! tensor, and the per-source outputs are reassembled with overlap-add.
//!
//! Built without the `stems` feature this backend always reports itself
//! unavailable; the rest of the crate still compiles and tests against
//! stub backends.

use crate::error::Result;
#[cfg(not(feature = "stems"))]
use crate::error::UnmixError;
use crate::audio::AudioBuffer;
use crate::separation::model::ModelConfig;
use crate::separation::Separator;
#[cfg(feature = "stems")]
use crate::separation::Source;
use crate::separation::SourceEstimates;
use std::path::Path;
#[cfg(feature = "stems")]
use std::path::PathBuf;
#[cfg(feature = "stems")]
use std::sync::Mutex;
#[allow(unused_imports)]
use tracing::{debug, info, warn};

#[cfg(feature = "stems")]
use super::chunking::{overlap_add, split, SegmentConfig, SeparatedSegment};
#[cfg(feature = "stems")]
use super::model::find_model_path;
#[cfg(feature = "stems")]
use ort::session::Session;

/// ONNX Runtime backend for a four-source separation model
pub struct OrtSeparator {
    config: ModelConfig,
    #[cfg(feature = "stems")]
    #[allow(dead_code)]
    model_path: PathBuf,
    /// ORT sessions take `&mut self` to run
    #[cfg(feature = "stems")]
    session: Mutex<Session>,
}

impl OrtSeparator {
    /// Load the model, searching the standard locations unless an explicit
    /// path is given.
    #[cfg(feature = "stems")]
    pub fn load(explicit: Option<&Path>, config: ModelConfig) -> Result<Self> {
        let model_path = find_model_path(explicit, &config)?;
        let session = Self::create_session(&model_path)?;

        info!(
            model = %model_path.display(),
            "separation model loaded"
        );

        Ok(Self {
            config,
            model_path,
            session: Mutex::new(session),
        })
    }

    #[cfg(not(feature = "stems"))]
    pub fn load(_explicit: Option<&Path>, _config: ModelConfig) -> Result<Self> {
        Err(UnmixError::model_unavailable(
            "this build does not include the ONNX backend; rebuild with --features stems",
        ))
    }

    #[cfg(feature = "stems")]
    fn create_session(model_path: &Path) -> Result<Session> {
        use crate::error::UnmixError;
        use ort::execution_providers::CPUExecutionProvider;

        Session::builder()
            .map_err(|e| {
                UnmixError::model_unavailable(format!("failed to create session builder: {}", e))
            })?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(|e| {
                UnmixError::model_unavailable(format!("failed to configure CPU provider: {}", e))
            })?
            .commit_from_file(model_path)
            .map_err(|e| {
                UnmixError::model_unavailable(format!(
                    "failed to load model '{}': {}",
                    model_path.display(),
                    e
                ))
            })
    }
}

impl Separator for OrtSeparator {
    fn sample_rate(&self) -> u32 {
        self.config.spec.sample_rate
    }

    fn channels(&self) -> usize {
        self.config.spec.channels
    }

    #[cfg(feature = "stems")]
    fn separate(&self, input: &AudioBuffer) -> Result<SourceEstimates> {
        self.run_inference(input)
    }

    #[cfg(not(feature = "stems"))]
    fn separate(&self, _input: &AudioBuffer) -> Result<SourceEstimates> {
        Err(UnmixError::model_unavailable(
            "this build does not include the ONNX backend; rebuild with --features stems",
        ))
    }

    fn name(&self) -> &'static str {
        "htdemucs-ort"
    }
}

#[cfg(feature = "stems")]
impl OrtSeparator {
    fn run_inference(&self, input: &AudioBuffer) -> Result<SourceEstimates> {
        use crate::error::UnmixError;
        use indicatif::{ProgressBar, ProgressStyle};
        use ndarray::Array3;
        use ort::value::Tensor;

        let num_channels = self.channels();
        let total_samples = input.num_samples();

        let mut session = self
            .session
            .lock()
            .map_err(|_| UnmixError::separation("session lock poisoned"))?;

        let segment_config = SegmentConfig::for_model(&self.config);
        let segments = split(input, &segment_config);
        debug!(
            segments = segments.len(),
            duration_secs = input.duration_secs(),
            "running inference"
        );

        let progress = ProgressBar::new(segments.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("separating [{bar:30}] {pos}/{len} segments")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut separated: Vec<SeparatedSegment> = Vec::with_capacity(segments.len());

        for segment in &segments {
            let seg_len = segment.audio.num_samples();
            let mut input_data = Array3::<f32>::zeros((1, num_channels, seg_len));
            for (ch, samples) in segment.audio.channels().iter().enumerate() {
                input_data
                    .slice_mut(ndarray::s![0, ch, ..])
                    .assign(&ndarray::ArrayView1::from(samples.as_slice()));
            }

            let input_tensor = Tensor::from_array(input_data)
                .map_err(|e| UnmixError::separation(format!("failed to build input tensor: {}", e)))?;

            let input_name = session
                .inputs
                .first()
                .map(|i| i.name.clone())
                .ok_or_else(|| UnmixError::separation("model declares no input tensors"))?;

            let outputs = session
                .run(ort::inputs![input_name.as_str() => input_tensor])
                .map_err(|e| UnmixError::separation(format!("inference failed: {}", e)))?;

            let output = outputs
                .iter()
                .next()
                .map(|(_, v)| v)
                .ok_or_else(|| UnmixError::separation("no output tensor from model"))?;

            let (output_shape, output_data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| UnmixError::separation(format!("failed to extract output: {}", e)))?;

            let shape: Vec<i64> = output_shape.iter().copied().collect();
            let estimates = extract_estimates(
                &shape,
                output_data,
                num_channels,
                seg_len,
                segment.audio.sample_rate(),
            )?;

            separated.push(SeparatedSegment {
                index: segment.index,
                start_sample: segment.start_sample,
                estimates,
            });
            progress.inc(1);
        }

        progress.finish_and_clear();

        let estimates = overlap_add(&separated, &segment_config, num_channels, total_samples);
        estimates
            .validate_against(input.sample_rate(), num_channels, total_samples)
            .map_err(UnmixError::separation)?;

        Ok(estimates)
    }
}

/// Pull per-source buffers out of a flat `[1, 4, channels, samples]` tensor.
///
/// Every dimension is validated before indexing; a model emitting an
/// unexpected layout fails here with a message naming the bad dimension
/// rather than landing audio in the wrong source.
#[cfg(feature = "stems")]
fn extract_estimates(
    shape: &[i64],
    data: &[f32],
    num_channels: usize,
    num_samples: usize,
    sample_rate: u32,
) -> Result<SourceEstimates> {
    use crate::error::UnmixError;

    if shape.len() != 4 {
        return Err(UnmixError::separation(format!(
            "expected 4D output tensor, got {}D with shape {:?}",
            shape.len(),
            shape
        )));
    }
    if shape[0] != 1 {
        return Err(UnmixError::separation(format!(
            "expected batch size 1, got {} (shape {:?})",
            shape[0], shape
        )));
    }
    if shape[1] != Source::ALL.len() as i64 {
        return Err(UnmixError::separation(format!(
            "expected {} sources, got {} (shape {:?})",
            Source::ALL.len(),
            shape[1],
            shape
        )));
    }
    if shape[2] != num_channels as i64 {
        return Err(UnmixError::separation(format!(
            "expected {} channels, got {} (shape {:?})",
            num_channels, shape[2], shape
        )));
    }
    if shape[3] != num_samples as i64 {
        return Err(UnmixError::separation(format!(
            "expected {} samples, got {} (shape {:?})",
            num_samples, shape[3], shape
        )));
    }

    let expected_len = Source::ALL
        .len()
        .checked_mul(num_channels)
        .and_then(|v| v.checked_mul(num_samples))
        .ok_or_else(|| {
            UnmixError::separation(format!("output shape {:?} overflows", shape))
        })?;
    if data.len() != expected_len {
        return Err(UnmixError::separation(format!(
            "output buffer length {} does not match shape {:?} (expected {})",
            data.len(),
            shape,
            expected_len
        )));
    }

    // Row-major layout: source-major, then channel, then sample
    let extract = |source: Source| -> AudioBuffer {
        let base = source.index() * num_channels * num_samples;
        let channels: Vec<Vec<f32>> = (0..num_channels)
            .map(|ch| {
                let start = base + ch * num_samples;
                data[start..start + num_samples].to_vec()
            })
            .collect();
        AudioBuffer::new(channels, sample_rate)
    };

    Ok(SourceEstimates::new(
        extract(Source::Drums),
        extract(Source::Bass),
        extract(Source::Other),
        extract(Source::Vocals),
    ))
}

//! Separation model configuration and discovery
//!
//! The ONNX model file is looked up in several common locations; the
//! pipeline never downloads it. Model variants declare their own required
//! sample rate and channel count, which callers must query through the
//! `Separator` trait rather than assume.

use crate::error::{Result, UnmixError};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable pointing at the model file
pub const MODEL_PATH_ENV: &str = "UNMIX_MODEL_PATH";

/// Input requirements a model variant declares
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// Sample rate the model was trained at
    pub sample_rate: u32,
    /// Channel count the model expects
    pub channels: usize,
}

/// Configuration for a separation model variant
#[derive(Debug, Clone, Copy)]
pub struct ModelConfig {
    /// Model filename searched for in the standard locations
    pub filename: &'static str,
    /// Declared input requirements
    pub spec: ModelSpec,
    /// Maximum segment length the model accepts, in seconds
    pub segment_seconds: f32,
    /// Overlap between segments, in seconds
    pub overlap_seconds: f32,
}

/// HTDemucs v4: 44.1kHz stereo, ~7.8s maximum segment
pub const HTDEMUCS: ModelConfig = ModelConfig {
    filename: "htdemucs.ort",
    spec: ModelSpec {
        sample_rate: 44100,
        channels: 2,
    },
    segment_seconds: 7.8,
    overlap_seconds: 1.0,
};

/// Find the model file by checking multiple common locations.
///
/// Search order:
/// 1. Explicit path (CLI `--model`)
/// 2. `UNMIX_MODEL_PATH` environment variable
/// 3. ProjectDirs cache: e.g. `~/.cache/unmix/models/` on Linux
/// 4. ProjectDirs data: e.g. `~/.local/share/unmix/models/` on Linux
/// 5. Current directory: `./models/`
///
/// Returns the first existing path, or `ModelUnavailable` listing every
/// location checked.
pub fn find_model_path(explicit: Option<&std::path::Path>, config: &ModelConfig) -> Result<PathBuf> {
    let mut checked: Vec<String> = Vec::new();

    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        checked.push(format!("--model {}", path.display()));
    }

    if let Some(env_path) = std::env::var_os(MODEL_PATH_ENV).map(PathBuf::from) {
        if env_path.exists() {
            return Ok(env_path);
        }
        checked.push(format!("{}={}", MODEL_PATH_ENV, env_path.display()));
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "unmix", "unmix") {
        let cache_path = proj_dirs.cache_dir().join("models").join(config.filename);
        if cache_path.exists() {
            return Ok(cache_path);
        }
        checked.push(cache_path.display().to_string());

        let data_path = proj_dirs.data_dir().join("models").join(config.filename);
        if data_path.exists() {
            return Ok(data_path);
        }
        checked.push(data_path.display().to_string());
    }

    let cwd_path = PathBuf::from("./models").join(config.filename);
    if cwd_path.exists() {
        return Ok(cwd_path.canonicalize().unwrap_or(cwd_path));
    }
    checked.push(cwd_path.display().to_string());

    let locations = checked
        .iter()
        .map(|loc| format!("  - {}", loc))
        .collect::<Vec<_>>()
        .join("\n");

    Err(UnmixError::ModelUnavailable {
        reason: format!(
            "separation model '{}' not found.\n\n\
             Locations checked:\n{}\n\n\
             To fix this, either:\n\
             1. Set the environment variable:\n\
                export {}=/path/to/{}\n\
             2. Or place the model in one of the above locations.",
            config.filename, locations, MODEL_PATH_ENV, config.filename
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins_when_it_exists() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("htdemucs.ort");
        std::fs::write(&model, b"fake model").unwrap();

        let found = find_model_path(Some(&model), &HTDEMUCS).unwrap();
        assert_eq!(found, model);
    }

    #[test]
    fn test_missing_model_lists_locations() {
        let bogus = std::path::Path::new("/no/such/model.ort");
        let err = find_model_path(Some(bogus), &HTDEMUCS).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/no/such/model.ort"));
        assert!(msg.contains(MODEL_PATH_ENV));
    }

    #[test]
    fn test_htdemucs_declares_stereo_44k() {
        assert_eq!(HTDEMUCS.spec.sample_rate, 44100);
        assert_eq!(HTDEMUCS.spec.channels, 2);
    }
}

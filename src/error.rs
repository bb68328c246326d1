//! Unified error types for unmix
//!
//! Every error is fatal to the pipeline invocation. The fallback chains in
//! ingestion and encoding are deliberate alternatives tried in order, not
//! retries; once a chain is exhausted the resulting error carries the full
//! record of what was attempted so operators can diagnose missing codec
//! support or missing tools.

use std::path::PathBuf;
use thiserror::Error;

/// One failed ingestion strategy, recorded for the final error message.
#[derive(Debug, Clone)]
pub struct DecodeAttempt {
    /// Strategy name (e.g. "symphonia", "ffmpeg+wav")
    pub strategy: &'static str,
    /// Why this strategy failed
    pub reason: String,
}

impl std::fmt::Display for DecodeAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

/// Top-level error type for unmix operations
#[derive(Debug, Error)]
pub enum UnmixError {
    #[error("Input file not found: '{0}'\n  Tip: Check the path exists and is readable")]
    InputNotFound(PathBuf),

    #[error(
        "Failed to decode audio file '{path}'. Strategies attempted:\n{}\n  Tip: If the file plays in other apps, install ffmpeg to enable the transcode fallback",
        .attempts.iter().map(|a| format!("  - {}", a)).collect::<Vec<_>>().join("\n")
    )]
    Decode {
        path: PathBuf,
        attempts: Vec<DecodeAttempt>,
    },

    #[error("Source separation failed: {reason}\n  Tip: This may indicate insufficient memory or an incompatible model file")]
    Separation { reason: String },

    #[error("Failed to encode output '{path}' as {format}: {reason}")]
    Encode {
        path: PathBuf,
        format: String,
        reason: String,
    },

    #[error("Required external tool '{tool}' is not installed: {hint}")]
    ToolMissing { tool: String, hint: String },

    #[error("Separation model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    Output { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for unmix operations
pub type Result<T> = std::result::Result<T, UnmixError>;

impl UnmixError {
    pub fn separation(reason: impl Into<String>) -> Self {
        UnmixError::Separation {
            reason: reason.into(),
        }
    }

    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        UnmixError::ModelUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an output error, expanding common IO failure kinds
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!(
                    "Permission denied. Check that you have write access to {}",
                    path.display()
                )
            }
            std::io::ErrorKind::NotFound => format!(
                "Directory does not exist: {}",
                path.parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            _ => err.to_string(),
        };
        UnmixError::Output { path, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_lists_every_attempt() {
        let err = UnmixError::Decode {
            path: PathBuf::from("song.xyz"),
            attempts: vec![
                DecodeAttempt {
                    strategy: "symphonia",
                    reason: "unsupported format".to_string(),
                },
                DecodeAttempt {
                    strategy: "wav",
                    reason: "not a RIFF file".to_string(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("symphonia: unsupported format"));
        assert!(msg.contains("wav: not a RIFF file"));
    }

    #[test]
    fn tool_missing_names_the_tool() {
        let err = UnmixError::ToolMissing {
            tool: "ffmpeg".to_string(),
            hint: "install it".to_string(),
        };
        assert!(err.to_string().contains("ffmpeg"));
    }
}

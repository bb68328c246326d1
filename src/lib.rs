//! unmix - Stem Separation & Remix Pipeline
//!
//! Decodes an audio file through a chain of fallback strategies, runs a
//! pretrained four-source separation model (drums, bass, other, vocals),
//! and remixes a chosen subset of the sources back into an output file
//! with clipping-safe levels.
//!
//! # Architecture
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `audio`: decoding, resampling, and output encoding
//! - `separation`: normalization, the ONNX model backend, and reassembly
//! - `remix`: source summation, level restoration, and peak scaling
//! - `pipeline`: end-to-end orchestration
//! - `ffmpeg`: external transcoder subprocess wrapper
//!
//! # Example
//!
//! ```no_run
//! use unmix::{config::Settings, pipeline};
//!
//! let settings = Settings {
//!     input: "track.mp3".into(),
//!     ..Settings::default()
//! };
//! let report = pipeline::run(&settings).expect("separation failed");
//! println!("wrote {} remixes", report.artifacts.len());
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod pipeline;
pub mod remix;
pub mod separation;

// Re-export key types at crate root
pub use audio::AudioBuffer;
pub use error::{Result, UnmixError};
pub use separation::{RemixSpec, Separator, Source, SourceEstimates};

//! Output encoding with graceful degradation
//!
//! Writes the final buffer to the requested container, trying progressively
//! more permissive strategies. When the requested container cannot be
//! honored (e.g. MP3 requested but no encoder available) the result is a
//! lossless WAV with the extension adjusted, and the substitution is
//! reported to the caller rather than silently renamed.
//!
//! Files are written to a `.part` sibling and renamed on success so a
//! half-written output can never be mistaken for a complete one.

use crate::audio::AudioBuffer;
use crate::error::{Result, UnmixError};
use crate::ffmpeg::{FfmpegTool, ScopedTempFile};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Requested output container/codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// 16-bit PCM WAV
    Wav16,
    /// 24-bit PCM WAV
    Wav24,
    /// MP3 via the external encoder
    Mp3,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Wav16 | OutputFormat::Wav24 => "wav",
            OutputFormat::Mp3 => "mp3",
        }
    }

    pub fn is_compressed(self) -> bool {
        matches!(self, OutputFormat::Mp3)
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Wav16 => "wav (16-bit PCM)",
            OutputFormat::Wav24 => "wav (24-bit PCM)",
            OutputFormat::Mp3 => "mp3",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Destination path plus desired container and quality parameters
#[derive(Debug, Clone)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub format: OutputFormat,
    /// MP3 bitrate in kbps; ignored for PCM formats
    pub bitrate_kbps: u32,
}

/// What was actually written, including any format substitution
#[derive(Debug, Clone)]
pub struct EncodeOutcome {
    /// Path of the file on disk (extension may differ from the request)
    pub path: PathBuf,
    /// Format actually written
    pub format: OutputFormat,
    /// Format the caller asked for
    pub requested: OutputFormat,
}

impl EncodeOutcome {
    /// True when the requested container could not be honored
    pub fn substituted(&self) -> bool {
        self.format != self.requested
    }
}

/// Encode a buffer to the target, trying fallback strategies in order.
///
/// Missing parent directories are created idempotently.
pub fn encode(
    buffer: &AudioBuffer,
    target: &OutputTarget,
    ffmpeg: Option<&FfmpegTool>,
) -> Result<EncodeOutcome> {
    if let Some(parent) = target.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| UnmixError::output_error(parent, e))?;
        }
    }

    let mut failures: Vec<String> = Vec::new();

    if target.format.is_compressed() {
        match ffmpeg {
            Some(tool) => match encode_mp3(buffer, target, tool) {
                Ok(outcome) => return Ok(outcome),
                Err(reason) => {
                    failures.push(format!("mp3: {}", reason));
                }
            },
            None => {
                failures.push("mp3: no compressed-codec encoder available (ffmpeg not found)".to_string());
            }
        }
    }

    // Lossless fallbacks, 24-bit preferred.
    let pcm_formats: &[OutputFormat] = match target.format {
        OutputFormat::Wav16 => &[OutputFormat::Wav16],
        _ => &[OutputFormat::Wav24, OutputFormat::Wav16],
    };

    for &format in pcm_formats {
        let path = path_with_extension(&target.path, format.extension());
        match write_wav(buffer, &path, format) {
            Ok(()) => {
                let outcome = EncodeOutcome {
                    path,
                    format,
                    requested: target.format,
                };
                if outcome.substituted() {
                    warn!(
                        "Requested {} could not be written; wrote {} instead at {}",
                        target.format,
                        outcome.format,
                        outcome.path.display()
                    );
                }
                return Ok(outcome);
            }
            Err(reason) => failures.push(format!("{}: {}", format, reason)),
        }
    }

    Err(UnmixError::Encode {
        path: target.path.clone(),
        format: target.format.name().to_string(),
        reason: failures.join("; "),
    })
}

/// Replace the extension so the on-disk name matches the actual container.
fn path_with_extension(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext)
}

/// Stage a PCM WAV, then hand it to ffmpeg for MP3 encoding.
fn encode_mp3(
    buffer: &AudioBuffer,
    target: &OutputTarget,
    ffmpeg: &FfmpegTool,
) -> std::result::Result<EncodeOutcome, String> {
    let final_path = path_with_extension(&target.path, "mp3");
    let part_path = part_path(&final_path);

    let staged = ScopedTempFile::for_input(&final_path);
    write_wav(buffer, staged.path(), OutputFormat::Wav16)?;

    ffmpeg.encode_mp3(staged.path(), &part_path, target.bitrate_kbps)?;

    std::fs::rename(&part_path, &final_path)
        .map_err(|e| format!("failed to move output into place: {}", e))?;

    debug!(
        "Encoded {} at {} kbps",
        final_path.display(),
        target.bitrate_kbps
    );

    Ok(EncodeOutcome {
        path: final_path,
        format: OutputFormat::Mp3,
        requested: target.format,
    })
}

/// Write PCM samples with hound, via a `.part` temp and atomic rename.
fn write_wav(
    buffer: &AudioBuffer,
    path: &Path,
    format: OutputFormat,
) -> std::result::Result<(), String> {
    let bits: u16 = match format {
        OutputFormat::Wav16 => 16,
        OutputFormat::Wav24 => 24,
        OutputFormat::Mp3 => return Err("mp3 is not a PCM format".to_string()),
    };

    let spec = hound::WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: bits,
        sample_format: hound::SampleFormat::Int,
    };

    let part = part_path(path);
    let mut writer =
        hound::WavWriter::create(&part, spec).map_err(|e| format!("failed to create WAV: {}", e))?;

    let full_scale = ((1i64 << (bits - 1)) - 1) as f32;
    let result = (|| -> std::result::Result<(), String> {
        for sample in buffer.to_interleaved() {
            let value = (sample * full_scale).clamp(-full_scale - 1.0, full_scale) as i32;
            if bits == 16 {
                writer
                    .write_sample(value as i16)
                    .map_err(|e| format!("failed to write sample: {}", e))?;
            } else {
                writer
                    .write_sample(value)
                    .map_err(|e| format!("failed to write sample: {}", e))?;
            }
        }
        writer
            .finalize()
            .map_err(|e| format!("failed to finalize WAV: {}", e))
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&part);
        return Err(e);
    }

    std::fs::rename(&part, path).map_err(|e| format!("failed to move output into place: {}", e))
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_buffer() -> AudioBuffer {
        let samples: Vec<f32> = (0..4410)
            .map(|i| (i as f32 / 4410.0 * std::f32::consts::TAU).sin() * 0.5)
            .collect();
        AudioBuffer::new(vec![samples.clone(), samples], 44100)
    }

    #[test]
    fn test_wav24_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget {
            path: dir.path().join("out.wav"),
            format: OutputFormat::Wav24,
            bitrate_kbps: 192,
        };

        let buffer = test_buffer();
        let outcome = encode(&buffer, &target, None).unwrap();
        assert!(!outcome.substituted());
        assert_eq!(outcome.format, OutputFormat::Wav24);
        assert!(outcome.path.exists());

        let reader = hound::WavReader::open(&outcome.path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 24);
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.duration(), 4410);
    }

    #[test]
    fn test_mp3_without_ffmpeg_substitutes_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget {
            path: dir.path().join("out.mp3"),
            format: OutputFormat::Mp3,
            bitrate_kbps: 192,
        };

        let outcome = encode(&test_buffer(), &target, None).unwrap();
        assert!(outcome.substituted());
        assert_eq!(outcome.format, OutputFormat::Wav24);
        assert_eq!(outcome.path.extension().unwrap(), "wav");
        assert!(outcome.path.exists());
        assert!(!dir.path().join("out.mp3").exists());
    }

    #[test]
    fn test_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget {
            path: dir.path().join("a/b/c/out.wav"),
            format: OutputFormat::Wav16,
            bitrate_kbps: 192,
        };

        let outcome = encode(&test_buffer(), &target, None).unwrap();
        assert!(outcome.path.exists());
    }

    #[test]
    fn test_no_part_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget {
            path: dir.path().join("out.wav"),
            format: OutputFormat::Wav16,
            bitrate_kbps: 192,
        };

        encode(&test_buffer(), &target, None).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }
}

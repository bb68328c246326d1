//! External transcoder subprocess wrapper
//!
//! ffmpeg is treated as an opaque, possibly-absent binary. Absence is a
//! distinct condition (`ToolMissing`) from a runtime failure, so the user
//! can be told to install the dependency rather than retry. The binary can
//! be overridden with the `UNMIX_FFMPEG` environment variable.

use crate::error::{Result, UnmixError};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Environment variable overriding the ffmpeg binary location
pub const FFMPEG_ENV: &str = "UNMIX_FFMPEG";

/// Handle to a verified ffmpeg installation
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    program: PathBuf,
}

impl FfmpegTool {
    /// Locate and verify ffmpeg, failing with `ToolMissing` if it is not
    /// installed or not runnable.
    pub fn locate() -> Result<Self> {
        let program = std::env::var_os(FFMPEG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));

        match Command::new(&program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => {
                debug!("ffmpeg found at {}", program.display());
                Ok(Self { program })
            }
            Ok(status) => Err(UnmixError::ToolMissing {
                tool: "ffmpeg".to_string(),
                hint: format!(
                    "'{} -version' exited with {}. Reinstall ffmpeg or set {} to a working binary",
                    program.display(),
                    status,
                    FFMPEG_ENV
                ),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(UnmixError::ToolMissing {
                tool: "ffmpeg".to_string(),
                hint: format!(
                    "install ffmpeg and ensure it is on PATH, or set {} to the binary location",
                    FFMPEG_ENV
                ),
            }),
            Err(e) => Err(UnmixError::Io(e)),
        }
    }

    /// Locate ffmpeg, returning `None` when unavailable.
    ///
    /// Used where absence triggers a fallback rather than an error.
    pub fn discover() -> Option<Self> {
        Self::locate().ok()
    }

    /// Transcode any input ffmpeg understands to a 16-bit PCM WAV file.
    ///
    /// Runtime failures are reported as a plain reason string; the caller
    /// folds it into its own error context (decode attempt record).
    pub fn transcode_to_wav(
        &self,
        input: &Path,
        output: &Path,
    ) -> std::result::Result<(), String> {
        let result = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg(output)
            .stdout(Stdio::null())
            .output()
            .map_err(|e| format!("failed to run ffmpeg: {}", e))?;

        if result.status.success() {
            Ok(())
        } else {
            Err(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr_tail(&result.stderr)
            ))
        }
    }

    /// Encode a staged WAV file to MP3 at the given bitrate.
    ///
    /// The output container is forced with `-f mp3` so the destination may
    /// carry a temporary extension.
    pub fn encode_mp3(
        &self,
        wav_input: &Path,
        output: &Path,
        bitrate_kbps: u32,
    ) -> std::result::Result<(), String> {
        let result = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(wav_input)
            .arg("-vn")
            .arg("-codec:a")
            .arg("libmp3lame")
            .arg("-b:a")
            .arg(format!("{}k", bitrate_kbps))
            .arg("-f")
            .arg("mp3")
            .arg(output)
            .stdout(Stdio::null())
            .output()
            .map_err(|e| format!("failed to run ffmpeg: {}", e))?;

        if result.status.success() {
            Ok(())
        } else {
            Err(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr_tail(&result.stderr)
            ))
        }
    }
}

/// Last few lines of stderr, enough to identify the failure without
/// dumping the whole transcript.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().rev().take(3).collect();
    lines.into_iter().rev().collect::<Vec<_>>().join(" | ")
}

/// Temporary file removed on drop, on every exit path.
///
/// Names are derived from the source path and process id so concurrent
/// runs on related inputs cannot collide.
pub struct ScopedTempFile {
    path: PathBuf,
}

impl ScopedTempFile {
    /// Reserve a temp WAV path for an intermediate transcode of `input`.
    pub fn for_input(input: &Path) -> Self {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("input");
        let name = format!("unmix-{}-{}.wav", stem, std::process::id());
        Self {
            path: std::env::temp_dir().join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedTempFile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                debug!("Failed to remove temp file {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_temp_file_is_removed_on_drop() {
        let tmp = ScopedTempFile::for_input(Path::new("/music/song.mp3"));
        let path = tmp.path().to_path_buf();
        std::fs::write(&path, b"data").unwrap();
        assert!(path.exists());
        drop(tmp);
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_names_derive_from_input() {
        let a = ScopedTempFile::for_input(Path::new("/music/a.mp3"));
        let b = ScopedTempFile::for_input(Path::new("/music/b.mp3"));
        assert_ne!(a.path(), b.path());
    }
}

//! CLI argument parsing

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// unmix - Separate a mix into stems and remix a chosen subset
///
/// Decodes the input through a chain of fallback strategies, runs a
/// pretrained four-source separation model, and writes the requested
/// remixes (vocals, instrumental, or both) to the output directory.
#[derive(Parser, Debug)]
#[command(name = "unmix")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input audio file
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Output directory for remixed files
    #[arg(short, long, value_name = "DIR", default_value = "output")]
    pub output: PathBuf,

    /// Which remixes to produce
    #[arg(short, long, value_enum, default_value_t = Mode::Both)]
    pub mode: Mode,

    /// Output format (mp3 requires ffmpeg; falls back to WAV without it)
    #[arg(short, long, value_enum, default_value_t = FormatArg::Wav24)]
    pub format: FormatArg,

    /// MP3 bitrate in kbps (ignored for WAV output)
    #[arg(long, value_name = "KBPS", default_value_t = 192)]
    pub bitrate: u32,

    /// Path to the separation model (overrides the standard search)
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

/// Which remixes a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Only the vocals remix
    Vocals,
    /// Only the instrumental remix (drums + bass + other)
    Instrumental,
    /// Both remixes from one separation pass
    Both,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Mode::Vocals => "vocals",
            Mode::Instrumental => "instrumental",
            Mode::Both => "both",
        })
    }
}

/// Output format as selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// MP3 via ffmpeg
    Mp3,
    /// 24-bit PCM WAV
    Wav24,
    /// 16-bit PCM WAV
    Wav16,
}

impl std::fmt::Display for FormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FormatArg::Mp3 => "mp3",
            FormatArg::Wav24 => "wav24",
            FormatArg::Wav16 => "wav16",
        })
    }
}

impl Cli {
    /// Log level from the verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["unmix", "song.mp3"]);
        assert_eq!(cli.input, PathBuf::from("song.mp3"));
        assert_eq!(cli.output, PathBuf::from("output"));
        assert_eq!(cli.mode, Mode::Both);
        assert_eq!(cli.format, FormatArg::Wav24);
        assert_eq!(cli.bitrate, 192);
    }

    #[test]
    fn test_mode_and_format_flags() {
        let cli = Cli::parse_from([
            "unmix", "song.flac", "-m", "vocals", "-f", "mp3", "--bitrate", "320",
        ]);
        assert_eq!(cli.mode, Mode::Vocals);
        assert_eq!(cli.format, FormatArg::Mp3);
        assert_eq!(cli.bitrate, 320);
    }

    #[test]
    fn test_verbosity_levels() {
        let cli = Cli::parse_from(["unmix", "x.wav", "-vv"]);
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
    }
}

//! Runtime configuration settings

use crate::audio::OutputFormat;
use crate::config::cli::{Cli, FormatArg, Mode};
use crate::separation::RemixSpec;
use std::path::PathBuf;

/// Runtime settings for one pipeline invocation
#[derive(Debug, Clone)]
pub struct Settings {
    /// Input audio file
    pub input: PathBuf,
    /// Output directory
    pub output_dir: PathBuf,
    /// Which remixes to produce
    pub mode: Mode,
    /// Requested output format
    pub format: OutputFormat,
    /// MP3 bitrate in kbps
    pub bitrate_kbps: u32,
    /// Explicit model path, if given
    pub model_path: Option<PathBuf>,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &Cli) -> Self {
        let format = match cli.format {
            FormatArg::Mp3 => OutputFormat::Mp3,
            FormatArg::Wav24 => OutputFormat::Wav24,
            FormatArg::Wav16 => OutputFormat::Wav16,
        };

        Self {
            input: cli.input.clone(),
            output_dir: cli.output.clone(),
            mode: cli.mode,
            format,
            bitrate_kbps: cli.bitrate,
            model_path: cli.model.clone(),
        }
    }

    /// The remixes this run produces: `(output stem name, selection)`
    pub fn remix_jobs(&self) -> Vec<(&'static str, RemixSpec)> {
        match self.mode {
            Mode::Vocals => vec![("vocals", RemixSpec::vocals())],
            Mode::Instrumental => vec![("instrumental", RemixSpec::instrumental())],
            Mode::Both => vec![
                ("vocals", RemixSpec::vocals()),
                ("instrumental", RemixSpec::instrumental()),
            ],
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_dir: PathBuf::from("output"),
            mode: Mode::Both,
            format: OutputFormat::Wav24,
            bitrate_kbps: 192,
            model_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::separation::Source;

    #[test]
    fn test_both_mode_runs_two_jobs() {
        let settings = Settings::default();
        let jobs = settings.remix_jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].0, "vocals");
        assert_eq!(jobs[1].0, "instrumental");
        assert!(!jobs[1].1.contains(Source::Vocals));
    }

    #[test]
    fn test_vocals_mode_runs_one_job() {
        let settings = Settings {
            mode: Mode::Vocals,
            ..Settings::default()
        };
        let jobs = settings.remix_jobs();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].1.contains(Source::Vocals));
    }
}

//! unmix CLI entry point

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use unmix::config::{Cli, Settings};
use unmix::pipeline;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli);

    if let Err(e) = validate_inputs(&cli) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let settings = Settings::from_cli(&cli);

    match pipeline::run(&settings) {
        Ok(report) => {
            println!();
            println!(
                "Wrote {} remix(es) from {:.1}s of audio in {:.1}s:",
                report.artifacts.len(),
                report.input_duration_secs,
                report.elapsed_secs
            );
            for artifact in &report.artifacts {
                println!(
                    "  {} ({}): {}",
                    artifact.name,
                    artifact.selection,
                    artifact.outcome.path.display()
                );
            }

            let substitutions: Vec<_> = report.substitutions().collect();
            if !substitutions.is_empty() {
                println!();
                for artifact in substitutions {
                    println!(
                        "Note: {} was requested as {} but written as {}",
                        artifact.name, artifact.outcome.requested, artifact.outcome.format
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = if cli.quiet {
        "error".to_string()
    } else {
        cli.log_level().to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn validate_inputs(cli: &Cli) -> Result<(), String> {
    if !cli.input.exists() {
        return Err(format!(
            "Input file does not exist: {}\n\n  Tip: Check the path is correct and accessible.\n  Example: unmix ./track.mp3 -o ./out",
            cli.input.display()
        ));
    }

    if cli.input.is_dir() {
        return Err(format!(
            "Input must be a file, not a directory: {}",
            cli.input.display()
        ));
    }

    // The output dir itself is created on demand; its parent must exist
    if let Some(parent) = cli.output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(format!(
                "Output parent directory does not exist: {}\n\n  Tip: mkdir -p {}",
                parent.display(),
                parent.display()
            ));
        }
    }

    Ok(())
}

use std::fs::OpenOptions;
use std::path::Path;

use clap::Parser;
use tracing::{Level, Subscriber, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;

mod cli;
mod commands;
mod config;
mod error;
mod media;
mod utils;

use cli::{CliArgs, Command};
use config::{AudioExtractConfig, PlaybackConfig};
use error::AppError;
use utils::format_bytes;

type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

fn main() {
    let args = CliArgs::parse();
    let log_guard = match init_logging(args.verbose, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = bootstrap(args);
    if let Err(e) = &result {
        report_failure(e);
    }

    // exit() skips destructors, the file writer must flush first
    drop(log_guard);
    if result.is_err() {
        std::process::exit(1);
    }
}

fn report_failure(error: &AppError) {
    eprintln!("Error: {error}");
    error!(error = ?error, "Application failed");
}

/// Logs go to stderr, and to `log_file` when given, so stdout only carries
/// command output.
fn build_subscriber(verbose: bool, log_file: Option<&Path>) -> Result<(BoxedSubscriber, Option<WorkerGuard>), AppError> {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).write(true).truncate(true).open(path)?;
            let (file_writer, guard) = tracing_appender::non_blocking(file);

            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_writer(MakeWriterExt::and(std::io::stderr, file_writer))
                .with_ansi(false)
                .finish();
            Ok((Box::new(subscriber), Some(guard)))
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .finish();
            Ok((Box::new(subscriber), None))
        }
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>, AppError> {
    let (subscriber, guard) = build_subscriber(verbose, log_file)?;
    tracing::subscriber::set_global_default(subscriber).map_err(|e| AppError::Initialization(e.to_string()))?;
    Ok(guard)
}

#[tokio::main]
async fn bootstrap(args: CliArgs) -> Result<(), AppError> {
    let show_progress = args.show_progress;

    match args.command {
        Command::Info { input, format } => {
            let summary = tokio::task::spawn_blocking(move || commands::info::probe(&input)).await??;
            println!("{}", commands::info::format_summary(&summary, format)?);
        }
        Command::ExtractAudio {
            input,
            output,
            no_adts,
            on_unsupported_rate,
        } => {
            let config = AudioExtractConfig {
                write_adts_header: !no_adts,
                on_unsupported_rate,
            };
            let stats = tokio::task::spawn_blocking(move || {
                commands::extract_audio::extract_audio(&input, &output, config, show_progress)
            })
            .await??;
            if stats.packets_skipped > 0 {
                info!(skipped = stats.packets_skipped, "Some payloads were not written");
            }
        }
        Command::ExtractVideo { input, output } => {
            let stats = tokio::task::spawn_blocking(move || {
                commands::extract_video::extract_video(&input, &output, show_progress)
            })
            .await??;
            info!(
                keyframes = stats.sync_samples,
                size = %format_bytes(stats.bytes_written),
                "Done"
            );
        }
        Command::DecodeAudio { input, output, format } => {
            let stats = tokio::task::spawn_blocking(move || {
                commands::decode_audio::decode_audio(&input, &output, format, show_progress)
            })
            .await??;
            info!(
                "Play it back with: avkit play <file> --sample-rate {} --channels {} --format {}",
                stats.sample_rate, stats.channels, format
            );
        }
        Command::Play {
            input,
            sample_rate,
            channels,
            format,
        } => {
            let config = PlaybackConfig {
                sample_rate,
                channels,
                format,
                ..Default::default()
            };
            commands::play::play(&input, config).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reaches_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avkit.log");

        let (subscriber, guard) = build_subscriber(false, Some(&path)).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            report_failure(&AppError::InvalidInput("broken input file".to_string()));
        });
        drop(guard);

        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains("Application failed"), "log was: {log}");
        assert!(log.contains("broken input file"));
    }
}

//! Application entry point — audio-transcriber.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (stderr; stdout is reserved for results).
//! 2. Load [`AppConfig`] from `--config` or the platform config dir, and
//!    write it back when `--write-config` is given.
//! 3. Build the [`TranscriptionEngine`] and load the model once.
//! 4. Stage every input file and transcribe them concurrently.
//! 5. Print one JSON line per file, in argument order.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use audio_transcriber::config::{AppConfig, AppPaths};
use audio_transcriber::pipeline::{TranscriptionEngine, TranscriptionError};
use audio_transcriber::upload::{self, UploadPolicy};

/// Transcribe audio and video files to text with a local Whisper model.
#[derive(Parser, Debug)]
#[command(name = "audio-transcriber", version, about)]
struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the effective settings back to the settings file, creating it
    /// with every key filled in when it does not exist yet.
    #[arg(long)]
    write_config: bool,

    /// Files to transcribe (mp3, wav, mp4, m4a by default).
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

/// One line of output.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Outcome {
    Transcribed {
        transcription: String,
        filename: String,
    },
    Failed {
        error: String,
    },
}

impl Outcome {
    fn failed(error: impl Into<String>) -> Self {
        Outcome::Failed {
            error: error.into(),
        }
    }

    fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    match loaded {
        Ok(config) => Ok(config),
        // Never replace a settings file we could not read with defaults.
        Err(e) if cli.write_config => Err(e.context("settings file is unreadable")),
        Err(e) => {
            log::warn!("Failed to load config ({e:#}); using defaults");
            Ok(AppConfig::default())
        }
    }
}

fn emit(outcome: &Outcome) -> Result<()> {
    let line = serde_json::to_string(outcome).context("serialising result")?;
    println!("{line}");
    Ok(())
}

async fn process(
    engine: Arc<TranscriptionEngine>,
    policy: Arc<UploadPolicy>,
    uploads_dir: Arc<Path>,
    file: PathBuf,
) -> Outcome {
    let staged = match upload::stage(&file, &policy, &uploads_dir).await {
        Ok(staged) => staged,
        Err(e) if e.is_client_error() => {
            log::warn!("Rejected {}: {e}", file.display());
            return Outcome::failed(e.to_string());
        }
        Err(e) => {
            log::error!("Could not stage {}: {e}", file.display());
            return Outcome::failed("Transcription failed");
        }
    };

    match engine.transcribe_upload(Some(&staged)).await {
        Ok(transcription) => Outcome::Transcribed {
            transcription,
            filename: staged.original_name,
        },
        Err(e) => Outcome::failed(e.user_message()),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // 2. Configuration
    let config = load_config(&cli)?;
    let paths = AppPaths::new();

    if cli.write_config {
        let target = cli.config.as_deref().unwrap_or(&paths.settings_file);
        config
            .save_to(target)
            .with_context(|| format!("writing settings to {}", target.display()))?;
        log::info!("Settings written to {}", target.display());
        if cli.files.is_empty() {
            return Ok(ExitCode::SUCCESS);
        }
    }

    if cli.files.is_empty() {
        emit(&Outcome::failed(
            TranscriptionError::MissingInput.user_message(),
        ))?;
        return Ok(ExitCode::FAILURE);
    }

    // 3. Engine + model
    let engine = Arc::new(TranscriptionEngine::from_config(&config, &paths));
    match engine.warm_up().await {
        Ok(()) => log::info!("Transcription model loaded"),
        // Requests below report the failure one by one.
        Err(e) => log::error!("Error loading transcription model: {e}"),
    }

    // 4. Stage + transcribe
    let policy = Arc::new(UploadPolicy::from_config(&config.upload));
    let uploads_dir: Arc<Path> = config.uploads_dir(&paths).into();

    let handles: Vec<_> = cli
        .files
        .into_iter()
        .map(|file| {
            tokio::spawn(process(
                Arc::clone(&engine),
                Arc::clone(&policy),
                Arc::clone(&uploads_dir),
                file,
            ))
        })
        .collect();

    // 5. Report in argument order
    let mut failed = false;
    for handle in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Transcription task aborted: {e}");
                Outcome::failed("Transcription failed")
            }
        };
        failed |= outcome.is_failure();
        emit(&outcome)?;
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

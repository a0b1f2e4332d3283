mod cli;
mod error;
mod logging;
mod progress;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use squeeze_engine::{
    BatchCoordinator, ClientConfig, ExifToolCopier, OutcomeStatus, TinifyClient,
    files::compressed_filename,
};
use tracing::{Instrument, error, info, warn};

use crate::{cli::Args, error::AppError, error::Result};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so `TINIFY_API_KEY` can come from it.
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let _log_guard = match logging::init_logging(args.verbose, args.quiet, args.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every requested file was compressed.
async fn run(args: Args) -> Result<bool> {
    if !args.has_input() {
        println!("Use the --help flag to see how to use this program");
        return Ok(true);
    }

    let api_key = args
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or(AppError::MissingApiKey)?;

    let client_config = ClientConfig {
        timeout: Duration::from_secs(args.timeout),
        ..ClientConfig::with_api_key(api_key)
    };
    let client = TinifyClient::new(client_config)?;
    let copier = ExifToolCopier::with_program(&args.exiftool);
    let config = args.run_config();

    info!(
        max_concurrency = config.max_concurrency,
        max_retries = config.max_retries,
        "Configured batch"
    );

    let mut all_compressed = true;

    if let Some(file) = args.file.as_deref() {
        all_compressed &= process_single_file(&client, &copier, &args, file).await?;
    }

    if let Some(folder) = args.bulk_from_folder.as_deref() {
        let span = progress::progress_span(&folder.display().to_string());
        let coordinator = BatchCoordinator::new(
            Arc::new(client.clone()),
            Arc::new(copier.clone()),
            config,
        )
        .on_outcome(progress::outcome_reporter(span.clone()));

        let result = coordinator.run_folder(folder).instrument(span).await?;
        all_compressed &= result.all_compressed();
    }

    Ok(all_compressed)
}

async fn process_single_file(
    client: &TinifyClient,
    copier: &ExifToolCopier,
    args: &Args,
    file: &Path,
) -> Result<bool> {
    let output = compressed_filename(file)?;
    let coordinator = BatchCoordinator::new(
        Arc::new(client.clone()),
        Arc::new(copier.clone()),
        args.run_config(),
    );

    let outcome = coordinator.run_one(file, &output).await;
    match outcome.status {
        OutcomeStatus::Succeeded => {
            info!("Done! Processing finished in {:?}", outcome.duration);
        }
        OutcomeStatus::FailedMetadata => {
            warn!(
                "Compressed without metadata into {} (took {:?})",
                outcome
                    .output_path
                    .as_deref()
                    .unwrap_or(&output)
                    .display(),
                outcome.duration
            );
        }
        OutcomeStatus::FailedExhausted => {
            error!(
                attempts = outcome.attempts,
                "Couldn't compress {}: {}",
                file.display(),
                outcome.last_error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(outcome.status != OutcomeStatus::FailedExhausted)
}

//! Console and optional file logging.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_indicatif::filter::IndicatifFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{AppError, Result};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "squeeze=info,squeeze_engine=info";

/// Name of the log file written with `--log`, e.g. `20240115093000.log`.
pub fn log_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("{}.log", now.format("%Y%m%d%H%M%S"))
}

fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Install the global subscriber.
///
/// Console output goes through the progress-bar layer so log lines do not tear the
/// bar. With `log_to_file`, a plain-text copy is appended to a timestamped file in the
/// working directory; keep the returned guard alive until exit so it gets flushed.
pub fn init_logging(verbose: bool, quiet: bool, log_to_file: bool) -> Result<Option<WorkerGuard>> {
    let indicatif_layer = IndicatifLayer::new();
    let console = fmt::layer()
        .with_target(false)
        .with_level(verbose)
        .with_writer(indicatif_layer.get_stderr_writer());

    let (file_layer, guard) = if log_to_file {
        let file_name = log_file_name(chrono::Local::now());
        let file_appender = tracing_appender::rolling::never(PathBuf::from("."), &file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(console)
        .with(file_layer)
        .with(indicatif_layer.with_filter(IndicatifFilter::new(false)))
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))?;

    Ok(guard)
}

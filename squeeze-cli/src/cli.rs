use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use squeeze_engine::{RetryPolicy, RunConfig};

/// Compress JPEG files with the Tinify API and restore their EXIF metadata.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Tinify API key. Read from TINIFY_API_KEY (or a .env file) when omitted
    #[arg(long = "apikey", env = "TINIFY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Compress a single file, written next to it as <name>_compressed.<ext>
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Compress every JPEG in a folder into <folder>/compressed
    #[arg(long, alias = "bulkfromfolder", value_name = "DIR")]
    pub bulk_from_folder: Option<PathBuf>,

    /// Maximum number of files processed concurrently (1 runs sequentially)
    #[arg(long, alias = "maxroutines", default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub max_concurrency: u16,

    /// Retries per file when a request to the Tinify API fails
    #[arg(long, alias = "maxretries", default_value_t = 2)]
    pub max_retries: u32,

    /// Base delay between retries in milliseconds, doubled on each retry (0 retries immediately)
    #[arg(long, default_value_t = 0)]
    pub retry_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    #[arg(long, default_value_t = 30_000)]
    pub max_retry_delay_ms: u64,

    /// Timeout for a single request to the Tinify API, in seconds (0 disables it)
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Path to the exiftool binary
    #[arg(long, env = "EXIFTOOL_PATH", default_value = "exiftool")]
    pub exiftool: PathBuf,

    /// Also write the log to <timestamp>.log in the current directory
    #[arg(long)]
    pub log: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn has_input(&self) -> bool {
        self.file.is_some() || self.bulk_from_folder.is_some()
    }

    pub fn run_config(&self) -> RunConfig {
        let retry = if self.retry_delay_ms == 0 {
            RetryPolicy::immediate()
        } else {
            RetryPolicy::exponential(
                Duration::from_millis(self.retry_delay_ms),
                Duration::from_millis(self.max_retry_delay_ms),
            )
        };
        RunConfig::new(usize::from(self.max_concurrency), self.max_retries).with_retry_policy(retry)
    }
}

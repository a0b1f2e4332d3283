//! Per-file pipeline: compress, download, restore metadata.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::client::Compressor;
use crate::error::ClientError;
use crate::metadata::{MetadataCopier, mark_as_metadata_missing};
use crate::model::{Outcome, OutcomeStatus, WorkItem};
use crate::retry::RetryPolicy;

/// Position of an item in its batch, rendered as `[k/n]` in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// 0-based index in submission order.
    pub index: usize,
    pub total: usize,
}

impl Position {
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }

    pub fn single() -> Self {
        Self::new(0, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.index + 1, self.total)
    }
}

/// Runs the compress -> download -> metadata sequence for one [`WorkItem`].
///
/// Compress and download are retried together up to `max_retries` extra times; the
/// metadata step runs once.
#[derive(Clone)]
pub struct UnitPipeline {
    compressor: Arc<dyn Compressor>,
    copier: Arc<dyn MetadataCopier>,
    retry: RetryPolicy,
}

impl UnitPipeline {
    pub fn new(compressor: Arc<dyn Compressor>, copier: Arc<dyn MetadataCopier>) -> Self {
        Self {
            compressor,
            copier,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Process `item` with one initial attempt plus `max_retries` retries.
    pub async fn process(&self, item: WorkItem, max_retries: u32) -> Outcome {
        self.process_at(item, max_retries, Position::single()).await
    }

    /// Same as [`process`](Self::process), logging with the item's batch position.
    pub async fn process_at(&self, item: WorkItem, max_retries: u32, position: Position) -> Outcome {
        let started = Instant::now();
        let name = item.display_name();
        let max_attempts = max_retries.saturating_add(1);

        info!("{position} Starting processing of {name}");

        let mut attempts = 0;
        let mut last_error: Option<String> = None;

        let downloaded = loop {
            attempts += 1;
            match self
                .compress_and_download(&item, position, attempts)
                .await
            {
                Ok(()) => break true,
                Err(e) => {
                    warn!(
                        attempt = attempts,
                        max_attempts,
                        retryable = e.is_retryable(),
                        error = %e,
                        "{position} Compression attempt failed for {name}"
                    );
                    last_error = Some(e.to_string());
                    if attempts >= max_attempts {
                        break false;
                    }
                    let delay = self.retry.delay_for_retry(attempts - 1);
                    if !delay.is_zero() {
                        debug!(delay_ms = delay.as_millis() as u64, "{position} Waiting before retry");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        };

        if !downloaded {
            self.discard_output(&item).await;
            error!("{position} Compression max attempts exhausted for {name}");
            return Outcome {
                item,
                status: OutcomeStatus::FailedExhausted,
                attempts,
                duration: started.elapsed(),
                output_path: None,
                last_error,
            };
        }

        info!("{position} Writing metadata back to compressed image {name}");
        let (status, output_path) = match self
            .copier
            .copy_metadata(item.source_path(), item.destination_path())
            .await
        {
            Ok(()) => (
                OutcomeStatus::Succeeded,
                item.destination_path().to_path_buf(),
            ),
            Err(e) => {
                warn!(error = %e, "{position} Couldn't write metadata to {name}, tagging as metadata-less");
                last_error = Some(e.to_string());
                let renamed = mark_as_metadata_missing(item.destination_path()).await;
                (OutcomeStatus::FailedMetadata, renamed)
            }
        };

        let duration = started.elapsed();
        info!(
            attempts,
            status = %status,
            "{position} Finished processing for image {name} (took {duration:?})"
        );

        Outcome {
            item,
            status,
            attempts,
            duration,
            output_path: Some(output_path),
            last_error,
        }
    }

    async fn compress_and_download(
        &self,
        item: &WorkItem,
        position: Position,
        attempt: u32,
    ) -> Result<(), ClientError> {
        let name = item.display_name();

        info!("{position} Compressing file {name} - attempt {attempt}");
        let location = self.compressor.compress(item.source_path()).await?;

        info!("{position} Downloading compressed image {name} - attempt {attempt}");
        self.compressor
            .download(&location, item.destination_path())
            .await
    }

    /// An exhausted item leaves nothing at its destination, partial or from an earlier run.
    async fn discard_output(&self, item: &WorkItem) {
        match tokio::fs::remove_file(item.destination_path()).await {
            Ok(()) => debug!(file = %item.destination_path().display(), "Removed output of failed item"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                file = %item.destination_path().display(),
                error = %e,
                "Failed to remove output of failed item"
            ),
        }
    }
}

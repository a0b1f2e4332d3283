//! Batch entry points: folder runs, explicit listings and single files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::client::Compressor;
use crate::config::RunConfig;
use crate::error::BatchError;
use crate::files::{destination_for, ensure_output_folder, enumerate_jpeg_files};
use crate::metadata::MetadataCopier;
use crate::model::{BatchResult, Outcome, WorkItem};
use crate::pipeline::UnitPipeline;
use crate::pool::{OutcomeCallback, WorkerPool};

/// Owns the run configuration and the collaborators shared by every item.
pub struct BatchCoordinator {
    pipeline: UnitPipeline,
    config: RunConfig,
    on_outcome: Option<OutcomeCallback>,
}

impl BatchCoordinator {
    pub fn new(
        compressor: Arc<dyn Compressor>,
        copier: Arc<dyn MetadataCopier>,
        config: RunConfig,
    ) -> Self {
        let pipeline =
            UnitPipeline::new(compressor, copier).with_retry_policy(config.retry.clone());
        Self {
            pipeline,
            config,
            on_outcome: None,
        }
    }

    /// Register a callback fired as each item completes.
    pub fn on_outcome(mut self, callback: OutcomeCallback) -> Self {
        self.on_outcome = Some(callback);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Map each source to `output_folder/<file name>`.
    ///
    /// Repeated sources and sources whose file name is already taken by an earlier entry
    /// are dropped, so each destination has a single writer.
    pub fn work_items(listing: &[PathBuf], output_folder: &Path) -> Vec<WorkItem> {
        let mut sources = HashSet::with_capacity(listing.len());
        let mut destinations = HashSet::with_capacity(listing.len());
        let mut items = Vec::with_capacity(listing.len());

        for source in listing {
            if !sources.insert(source.as_path()) {
                warn!(file = %source.display(), "Ignoring duplicate input");
                continue;
            }
            let destination = destination_for(output_folder, source);
            if !destinations.insert(destination.clone()) {
                warn!(
                    file = %source.display(),
                    destination = %destination.display(),
                    "Ignoring input whose output name is already taken"
                );
                continue;
            }
            items.push(WorkItem::new(source, destination));
        }
        items
    }

    /// Compress every JPEG directly inside `input_folder` into `<input_folder>/compressed`.
    ///
    /// Fails before touching any file when the folder cannot be listed or the output
    /// folder cannot be created.
    pub async fn run_folder(&self, input_folder: &Path) -> Result<BatchResult, BatchError> {
        info!("Starting conversion of folder {}", input_folder.display());

        let listing = enumerate_jpeg_files(input_folder).await?;
        let output_folder = ensure_output_folder(input_folder).await?;

        Ok(self.run(&listing, &output_folder).await)
    }

    /// Process `listing` into `output_folder`. Never aborts on per-item failures.
    pub async fn run(&self, listing: &[PathBuf], output_folder: &Path) -> BatchResult {
        let items = Self::work_items(listing, output_folder);
        if items.is_empty() {
            info!("No JPEG files to process");
            return BatchResult::default();
        }

        let mut pool = WorkerPool::new(self.pipeline.clone());
        if let Some(callback) = &self.on_outcome {
            pool = pool.on_outcome(Arc::clone(callback));
        }

        let result = pool.run_all(items, &self.config).await;
        log_summary(&result);
        result
    }

    /// Process a single file synchronously, without the pool.
    pub async fn run_one(&self, input: &Path, output: &Path) -> Outcome {
        info!("Starting conversion of file {}", input.display());

        let outcome = self
            .pipeline
            .process(WorkItem::new(input, output), self.config.max_retries)
            .await;
        if let Some(callback) = &self.on_outcome {
            callback(&outcome, 1, 1);
        }
        outcome
    }
}

fn log_summary(result: &BatchResult) {
    for outcome in result.outcomes().iter().filter(|o| !o.is_success()) {
        warn!(
            file = %outcome.item.source_path().display(),
            status = %outcome.status,
            attempts = outcome.attempts,
            error = outcome.last_error.as_deref().unwrap_or("-"),
            "File not fully processed"
        );
    }
    info!("Done! {}", result.summary());
}

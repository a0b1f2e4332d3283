//! Bounded worker pool draining a fixed list of work items.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::config::RunConfig;
use crate::model::{BatchResult, Outcome, OutcomeStatus, WorkItem};
use crate::pipeline::{Position, UnitPipeline};

/// Invoked once per finished item with `(outcome, completed, total)`.
pub type OutcomeCallback = Arc<dyn Fn(&Outcome, usize, usize) + Send + Sync>;

/// Runs a [`UnitPipeline`] for every item, at most `max_concurrency` at a time.
///
/// Admission follows input order through a fair semaphore. `run_all` returns only once
/// every item has produced exactly one [`Outcome`].
pub struct WorkerPool {
    pipeline: UnitPipeline,
    on_outcome: Option<OutcomeCallback>,
}

impl WorkerPool {
    pub fn new(pipeline: UnitPipeline) -> Self {
        Self {
            pipeline,
            on_outcome: None,
        }
    }

    /// Register a callback fired as each item completes.
    pub fn on_outcome(mut self, callback: OutcomeCallback) -> Self {
        self.on_outcome = Some(callback);
        self
    }

    pub async fn run_all(&self, items: Vec<WorkItem>, config: &RunConfig) -> BatchResult {
        let pipeline = self.pipeline.clone().with_retry_policy(config.retry.clone());

        if config.is_sequential() {
            self.run_sequential(&pipeline, items, config).await
        } else {
            self.run_concurrent(Arc::new(pipeline), items, config).await
        }
    }

    async fn run_sequential(
        &self,
        pipeline: &UnitPipeline,
        items: Vec<WorkItem>,
        config: &RunConfig,
    ) -> BatchResult {
        let total = items.len();
        info!("Processing {total} file(s) sequentially");

        let mut result = BatchResult::with_capacity(total);
        for (index, item) in items.into_iter().enumerate() {
            let outcome = pipeline
                .process_at(item, config.max_retries, Position::new(index, total))
                .await;
            self.record(outcome, &mut result, total);
        }
        result
    }

    async fn run_concurrent(
        &self,
        pipeline: Arc<UnitPipeline>,
        items: Vec<WorkItem>,
        config: &RunConfig,
    ) -> BatchResult {
        let total = items.len();
        let mut result = BatchResult::with_capacity(total);
        if total == 0 {
            return result;
        }

        let limit = config.max_concurrency.min(total);
        info!("Processing {total} file(s) with up to {limit} concurrent pipelines");

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<Id, WorkItem> = HashMap::with_capacity(limit);

        for (index, item) in items.into_iter().enumerate() {
            // Drain finished units while waiting so progress is reported as it happens.
            let permit = loop {
                tokio::select! {
                    permit = Arc::clone(&semaphore).acquire_owned() => break permit,
                    Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                        self.collect(joined, &mut in_flight, &mut result, total);
                    }
                }
            };
            let permit = permit.expect("admission semaphore is never closed");

            let pipeline = Arc::clone(&pipeline);
            let position = Position::new(index, total);
            let max_retries = config.max_retries;
            let task_item = item.clone();
            let handle = tasks.spawn(async move {
                let _permit = permit;
                pipeline.process_at(task_item, max_retries, position).await
            });
            debug!(task = %handle.id(), "{position} Admitted {}", item.display_name());
            in_flight.insert(handle.id(), item);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            self.collect(joined, &mut in_flight, &mut result, total);
        }

        result
    }

    fn collect(
        &self,
        joined: Result<(Id, Outcome), JoinError>,
        in_flight: &mut HashMap<Id, WorkItem>,
        result: &mut BatchResult,
        total: usize,
    ) {
        let outcome = match joined {
            Ok((id, outcome)) => {
                let tracked = in_flight.remove(&id);
                debug_assert!(tracked.is_some(), "pipeline task {id} was never registered");
                outcome
            }
            Err(join_error) => {
                // Every spawned task is registered before the next join, so a missing
                // id would mean an item without an outcome.
                let Some(item) = in_flight.remove(&join_error.id()) else {
                    unreachable!("pipeline task {} was never registered", join_error.id());
                };
                error!(error = %join_error, "Pipeline for {} aborted", item.display_name());
                Outcome {
                    item,
                    status: OutcomeStatus::FailedExhausted,
                    attempts: 1,
                    duration: Duration::ZERO,
                    output_path: None,
                    last_error: Some(join_error.to_string()),
                }
            }
        };
        self.record(outcome, result, total);
    }

    fn record(&self, outcome: Outcome, result: &mut BatchResult, total: usize) {
        result.push(outcome);
        if let (Some(callback), Some(outcome)) = (&self.on_outcome, result.outcomes().last()) {
            callback(outcome, result.len(), total);
        }
    }
}

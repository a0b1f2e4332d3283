//! Work items, per-file outcomes and the aggregated batch result.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One source -> destination unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    source_path: PathBuf,
    destination_path: PathBuf,
}

impl WorkItem {
    pub fn new(source_path: impl Into<PathBuf>, destination_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }

    /// File name of the source, for log lines.
    pub fn display_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}

/// Terminal status of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    /// Compressed, downloaded and metadata restored.
    Succeeded,
    /// Every compress/download attempt failed; no output file exists.
    FailedExhausted,
    /// Compressed file exists but metadata could not be restored.
    FailedMetadata,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Succeeded => write!(f, "succeeded"),
            OutcomeStatus::FailedExhausted => write!(f, "failed (attempts exhausted)"),
            OutcomeStatus::FailedMetadata => write!(f, "failed (metadata missing)"),
        }
    }
}

/// Result of processing one [`WorkItem`].
#[derive(Debug, Clone)]
pub struct Outcome {
    pub item: WorkItem,
    pub status: OutcomeStatus,
    /// Compress/download attempts made, at least 1.
    pub attempts: u32,
    pub duration: Duration,
    /// Where the compressed file ended up, if one was written.
    pub output_path: Option<PathBuf>,
    /// Last error seen while processing, if any.
    pub last_error: Option<String>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

/// Counts per [`OutcomeStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed_metadata: usize,
    pub failed_exhausted: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed_metadata + self.failed_exhausted
    }

    fn record(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Succeeded => self.succeeded += 1,
            OutcomeStatus::FailedMetadata => self.failed_metadata += 1,
            OutcomeStatus::FailedExhausted => self.failed_exhausted += 1,
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file(s): {} succeeded, {} without metadata, {} failed",
            self.total(),
            self.succeeded,
            self.failed_metadata,
            self.failed_exhausted
        )
    }
}

/// All outcomes of a batch, one per submitted [`WorkItem`], in completion order.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    outcomes: Vec<Outcome>,
}

impl BatchResult {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<Outcome> {
        self.outcomes
    }

    /// Outcome recorded for the given source file.
    pub fn get(&self, source_path: &Path) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.item.source_path() == source_path)
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for outcome in &self.outcomes {
            summary.record(outcome.status);
        }
        summary
    }

    /// True when no item ended with every attempt exhausted.
    pub fn all_compressed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| outcome.status != OutcomeStatus::FailedExhausted)
    }
}

impl FromIterator<Outcome> for BatchResult {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

//! # Squeeze Engine
//!
//! Batch engine that compresses JPEG files through a remote optimizer service and
//! restores the metadata the service strips.
//!
//! The engine is split into three layers:
//!
//! - [`UnitPipeline`] runs compress, download and metadata restore for one file and
//!   owns the per-file retry loop
//! - [`WorkerPool`] bounds how many pipelines run at once and waits for all of them
//! - [`BatchCoordinator`] maps inputs to destinations, runs the pool and reports
//!
//! Remote compression and metadata copying sit behind the [`Compressor`] and
//! [`MetadataCopier`] traits. [`TinifyClient`] and [`ExifToolCopier`] are the
//! production implementations.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod files;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod retry;

pub use client::{Compressor, CompressionReport, LocationHandle, TinifyClient};
pub use config::{ClientConfig, RunConfig};
pub use coordinator::BatchCoordinator;
pub use error::{BatchError, ClientError, MetadataError};
pub use metadata::{ExifToolCopier, MetadataCopier, mark_as_metadata_missing};
pub use model::{BatchResult, BatchSummary, Outcome, OutcomeStatus, WorkItem};
pub use pipeline::UnitPipeline;
pub use pool::{OutcomeCallback, WorkerPool};
pub use retry::RetryPolicy;

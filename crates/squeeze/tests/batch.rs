use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use squeeze_engine::{
    BatchCoordinator, BatchError, ClientError, Compressor, LocationHandle, MetadataCopier,
    MetadataError, OutcomeStatus, RunConfig,
};

/// Scripted remote service: each file name maps to the number of compress calls that
/// fail before one succeeds.
#[derive(Default)]
struct ScriptedCompressor {
    failures_before_success: HashMap<String, usize>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedCompressor {
    fn failing(name: &str, failures: usize) -> Self {
        Self {
            failures_before_success: HashMap::from([(name.to_string(), failures)]),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Compressor for ScriptedCompressor {
    async fn compress(&self, source: &Path) -> Result<LocationHandle, ClientError> {
        let name = source.file_name().unwrap().to_string_lossy().into_owned();
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(name.clone()).or_default();
            *count += 1;
            *count
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failures = self.failures_before_success.get(&name).copied().unwrap_or(0);
        if call <= failures {
            return Err(ClientError::io(source, std::io::Error::other("connection reset")));
        }
        Ok(LocationHandle::new(source.display().to_string()))
    }

    async fn download(
        &self,
        location: &LocationHandle,
        destination: &Path,
    ) -> Result<(), ClientError> {
        let original = tokio::fs::read(location.as_str())
            .await
            .map_err(|e| ClientError::io(location.as_str(), e))?;
        let compressed = &original[..original.len() / 2];
        tokio::fs::write(destination, compressed)
            .await
            .map_err(|e| ClientError::io(destination, e))
    }
}

struct ScriptedCopier {
    fail: bool,
}

#[async_trait]
impl MetadataCopier for ScriptedCopier {
    async fn copy_metadata(&self, _: &Path, _: &Path) -> Result<(), MetadataError> {
        if self.fail {
            return Err(MetadataError::Spawn {
                program: "exiftool".into(),
                source: std::io::Error::other("missing"),
            });
        }
        Ok(())
    }
}

fn coordinator(
    compressor: Arc<ScriptedCompressor>,
    metadata_fails: bool,
    config: RunConfig,
) -> BatchCoordinator {
    BatchCoordinator::new(
        compressor,
        Arc::new(ScriptedCopier {
            fail: metadata_fails,
        }),
        config,
    )
}

fn write_jpeg(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"0123456789abcdef").unwrap();
    path
}

#[tokio::test]
async fn single_file_succeeds_after_two_failures() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_jpeg(dir.path(), "a.jpg");
    let output = dir.path().join("a_compressed.jpg");

    let compressor = Arc::new(ScriptedCompressor::failing("a.jpg", 2));
    let outcome = coordinator(compressor, false, RunConfig::new(1, 2))
        .run_one(&source, &output)
        .await;

    assert_eq!(outcome.status, OutcomeStatus::Succeeded);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(std::fs::read(&output).unwrap(), b"01234567");
}

#[tokio::test]
async fn single_file_without_retries_is_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_jpeg(dir.path(), "a.jpg");
    let output = dir.path().join("a_compressed.jpg");

    let compressor = Arc::new(ScriptedCompressor::failing("a.jpg", 1));
    let outcome = coordinator(compressor, false, RunConfig::new(1, 0))
        .run_one(&source, &output)
        .await;

    assert_eq!(outcome.status, OutcomeStatus::FailedExhausted);
    assert_eq!(outcome.attempts, 1);
    assert!(!output.exists());
    assert!(source.exists());
}

#[tokio::test]
async fn metadata_failure_keeps_tagged_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_jpeg(dir.path(), "a.jpg");
    let output = dir.path().join("a_compressed.jpg");

    let outcome = coordinator(Arc::new(ScriptedCompressor::default()), true, RunConfig::new(1, 2))
        .run_one(&source, &output)
        .await;

    assert_eq!(outcome.status, OutcomeStatus::FailedMetadata);
    assert!(!output.exists());
    assert!(dir.path().join("a_compressed_nometadata.jpg").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn folder_run_respects_concurrency_limit() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["1.jpg", "2.JPG", "3.jpeg", "4.jpg", "5.jpg"] {
        write_jpeg(dir.path(), name);
    }
    write_jpeg(dir.path(), "notes.txt");

    let compressor = Arc::new(ScriptedCompressor::failing("3.jpeg", 10));
    let result = coordinator(compressor.clone(), false, RunConfig::new(2, 1))
        .run_folder(dir.path())
        .await
        .unwrap();

    assert_eq!(result.len(), 5);
    assert!(compressor.peak.load(Ordering::SeqCst) <= 2);

    let summary = result.summary();
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed_exhausted, 1);

    let failed = result.get(&dir.path().join("3.jpeg")).unwrap();
    assert_eq!(failed.attempts, 2);

    let output = dir.path().join("compressed");
    for name in ["1.jpg", "2.JPG", "4.jpg", "5.jpg"] {
        assert!(output.join(name).exists(), "{name} missing");
    }
    assert!(!output.join("3.jpeg").exists());
}

#[tokio::test]
async fn empty_folder_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_jpeg(dir.path(), "readme.md");

    let result = coordinator(Arc::new(ScriptedCompressor::default()), false, RunConfig::default())
        .run_folder(dir.path())
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.summary().total(), 0);
}

#[tokio::test]
async fn unreadable_folder_aborts_before_work() {
    let dir = tempfile::tempdir().unwrap();
    let compressor = Arc::new(ScriptedCompressor::default());

    let err = coordinator(compressor.clone(), false, RunConfig::default())
        .run_folder(&dir.path().join("missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::UnreadableInput { .. }));
    assert!(compressor.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rerun_overwrites_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    write_jpeg(dir.path(), "a.jpg");
    let output = dir.path().join("compressed");
    std::fs::create_dir(&output).unwrap();
    std::fs::write(output.join("a.jpg"), b"a much longer stale payload").unwrap();

    let coordinator = coordinator(Arc::new(ScriptedCompressor::default()), false, RunConfig::new(3, 0));
    for _ in 0..2 {
        let result = coordinator.run_folder(dir.path()).await.unwrap();
        assert_eq!(result.summary().succeeded, 1);
        assert_eq!(std::fs::read(output.join("a.jpg")).unwrap(), b"01234567");
    }
}

#[tokio::test]
async fn uncreatable_output_folder_aborts_before_work() {
    let dir = tempfile::tempdir().unwrap();
    write_jpeg(dir.path(), "a.jpg");
    std::fs::write(dir.path().join("compressed"), b"not a folder").unwrap();
    let compressor = Arc::new(ScriptedCompressor::default());

    let err = coordinator(compressor.clone(), false, RunConfig::default())
        .run_folder(dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::OutputFolder { .. }));
    assert!(compressor.calls.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn colliding_file_names_keep_first_output() {
    let dir = tempfile::tempdir().unwrap();
    for sub in ["x", "y"] {
        std::fs::create_dir(dir.path().join(sub)).unwrap();
        write_jpeg(&dir.path().join(sub), "p.jpg");
    }
    let output = dir.path().join("out");
    std::fs::create_dir(&output).unwrap();
    let listing = vec![dir.path().join("x/p.jpg"), dir.path().join("y/p.jpg")];

    let compressor = Arc::new(ScriptedCompressor::default());
    let result = coordinator(compressor.clone(), false, RunConfig::new(2, 0))
        .run(&listing, &output)
        .await;

    assert_eq!(result.len(), 1);
    let kept = result.get(&listing[0]).unwrap();
    assert_eq!(kept.status, OutcomeStatus::Succeeded);
    assert!(output.join("p.jpg").exists());
    assert!(result.get(&listing[1]).is_none());
    assert_eq!(compressor.calls.lock().unwrap().get("p.jpg"), Some(&1));
}

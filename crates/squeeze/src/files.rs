//! Filesystem helpers: input discovery and output path derivation.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BatchError;

/// Name of the folder created next to the inputs for compressed files.
pub const COMPRESSED_FOLDER_NAME: &str = "compressed";

/// Suffix appended to the file stem by the single-file command.
pub const COMPRESSED_SUFFIX: &str = "_compressed";

/// Whether the path has a `jpg`/`jpeg` extension, case-insensitively.
pub fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
}

/// List the JPEG files directly inside `folder`, sorted by file name.
///
/// Subdirectories are skipped and not descended into.
pub async fn enumerate_jpeg_files(folder: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if folder.as_os_str().is_empty() {
        return Err(BatchError::EmptyFolderPath);
    }

    let unreadable = |source: std::io::Error| BatchError::UnreadableInput {
        path: folder.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(folder).await.map_err(unreadable)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let file_type = entry.file_type().await.map_err(unreadable)?;
        if file_type.is_dir() {
            continue;
        }

        let path = entry.path();
        if is_jpeg(&path) {
            files.push(path);
        } else {
            debug!(file = %path.display(), "Skipping non-JPEG file");
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Create `<folder>/compressed` if needed and return its path.
pub async fn ensure_output_folder(folder: &Path) -> Result<PathBuf, BatchError> {
    let output = folder.join(COMPRESSED_FOLDER_NAME);
    tokio::fs::create_dir_all(&output)
        .await
        .map_err(|source| BatchError::OutputFolder {
            path: output.clone(),
            source,
        })?;
    Ok(output)
}

/// Destination of `source` inside `output_folder`; only the file name is kept.
pub fn destination_for(output_folder: &Path, source: &Path) -> PathBuf {
    match source.file_name() {
        Some(name) => output_folder.join(name),
        None => output_folder.join(source),
    }
}

/// Output path for the single-file command: `<stem>_compressed.<ext>` next to the source.
pub fn compressed_filename(path: &Path) -> Result<PathBuf, BatchError> {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return Err(BatchError::invalid_input(path, "missing extension"));
    };
    if !is_jpeg(path) {
        return Err(BatchError::invalid_input(path, "this file is not a JPG or JPEG"));
    }

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(path.with_file_name(format!("{stem}{COMPRESSED_SUFFIX}.{ext}")))
}

/// Path with `suffix` inserted between the file stem and the extension.
pub(crate) fn with_stem_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_detection_is_case_insensitive() {
        assert!(is_jpeg(Path::new("a.jpg")));
        assert!(is_jpeg(Path::new("a.JPEG")));
        assert!(is_jpeg(Path::new("dir.v2/a.JpG")));
        assert!(!is_jpeg(Path::new("a.png")));
        assert!(!is_jpeg(Path::new("jpg")));
    }

    #[test]
    fn compressed_filename_keeps_extension_case() {
        let out = compressed_filename(Path::new("/photos/IMG_1.JPG")).unwrap();
        assert_eq!(out, PathBuf::from("/photos/IMG_1_compressed.JPG"));
    }

    #[test]
    fn compressed_filename_rejects_other_files() {
        assert!(matches!(
            compressed_filename(Path::new("notes")),
            Err(BatchError::InvalidInput { .. })
        ));
        assert!(matches!(
            compressed_filename(Path::new("image.png")),
            Err(BatchError::InvalidInput { .. })
        ));
    }

    #[test]
    fn destination_drops_source_directories() {
        let dest = destination_for(Path::new("/out"), Path::new("/in/nested/a.jpg"));
        assert_eq!(dest, PathBuf::from("/out/a.jpg"));
    }

    #[test]
    fn stem_suffix_is_inserted_before_extension() {
        assert_eq!(
            with_stem_suffix(Path::new("/out/a.b.jpg"), "_x"),
            PathBuf::from("/out/a.b_x.jpg")
        );
    }

    #[tokio::test]
    async fn enumerate_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.JPG", "a.jpeg", "c.png", "noext"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.jpg")).unwrap();
        std::fs::write(dir.path().join("sub.jpg").join("d.jpg"), b"x").unwrap();

        let files = enumerate_jpeg_files(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpeg", "b.JPG"]);
    }

    #[tokio::test]
    async fn enumerate_missing_folder_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            enumerate_jpeg_files(&missing).await,
            Err(BatchError::UnreadableInput { .. })
        ));
        assert!(matches!(
            enumerate_jpeg_files(Path::new("")).await,
            Err(BatchError::EmptyFolderPath)
        ));
    }

    #[tokio::test]
    async fn ensure_output_folder_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = ensure_output_folder(dir.path()).await.unwrap();
        let second = ensure_output_folder(dir.path()).await.unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
        assert!(first.ends_with(COMPRESSED_FOLDER_NAME));
    }
}

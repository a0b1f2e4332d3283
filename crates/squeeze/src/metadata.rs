//! Metadata restore on compressed files.
//!
//! The remote service strips most EXIF data; [`ExifToolCopier`] copies the tags back
//! from the original with `exiftool`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::MetadataError;
use crate::files::with_stem_suffix;

/// Suffix added to compressed files whose metadata could not be restored.
pub const NO_METADATA_SUFFIX: &str = "_nometadata";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Copies descriptive tags from a source image onto its compressed counterpart.
#[async_trait]
pub trait MetadataCopier: Send + Sync {
    async fn copy_metadata(&self, source: &Path, destination: &Path) -> Result<(), MetadataError>;
}

/// [`MetadataCopier`] backed by the `exiftool` binary.
#[derive(Debug, Clone)]
pub struct ExifToolCopier {
    program: PathBuf,
}

impl Default for ExifToolCopier {
    fn default() -> Self {
        Self::new()
    }
}

impl ExifToolCopier {
    /// Use `EXIFTOOL_PATH` when set, `exiftool` from `PATH` otherwise.
    pub fn new() -> Self {
        Self {
            program: std::env::var_os("EXIFTOOL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("exiftool")),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments copying every tag group from `source` into `destination` in place.
    pub fn build_args<'a>(source: &'a Path, destination: &'a Path) -> Vec<&'a OsStr> {
        vec![
            OsStr::new("-overwrite_original"),
            OsStr::new("-TagsFromFile"),
            source.as_os_str(),
            OsStr::new("-all:all>all:all"),
            destination.as_os_str(),
        ]
    }

    fn command(&self) -> tokio::process::Command {
        #[allow(unused_mut)]
        let mut cmd = tokio::process::Command::new(&self.program);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
        cmd
    }
}

#[async_trait]
impl MetadataCopier for ExifToolCopier {
    async fn copy_metadata(&self, source: &Path, destination: &Path) -> Result<(), MetadataError> {
        let program = self.program.display().to_string();
        debug!(program = %program, source = %source.display(), destination = %destination.display(), "Copying metadata");

        let output = self
            .command()
            .args(Self::build_args(source, destination))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| MetadataError::Spawn {
                program: program.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }

        Err(MetadataError::Failed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Rename `destination` to `<stem>_nometadata.<ext>` and return the new path.
///
/// If the rename itself fails the file stays where it is and its current path is
/// returned.
pub async fn mark_as_metadata_missing(destination: &Path) -> PathBuf {
    let renamed = with_stem_suffix(destination, NO_METADATA_SUFFIX);
    match tokio::fs::rename(destination, &renamed).await {
        Ok(()) => renamed,
        Err(e) => {
            warn!(file = %destination.display(), error = %e, "Failed to tag file as metadata-less");
            destination.to_path_buf()
        }
    }
}

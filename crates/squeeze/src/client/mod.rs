//! Remote compression seam.

mod tinify;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::error::ClientError;

pub use tinify::{CompressionReport, ImageInfo, TinifyClient};

/// Where the remote service keeps a compressed result until it is downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationHandle(String);

impl LocationHandle {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote compression service.
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Upload `source` for compression and return where the result can be fetched.
    async fn compress(&self, source: &Path) -> Result<LocationHandle, ClientError>;

    /// Fetch the compressed result into `destination`, replacing any existing file.
    async fn download(
        &self,
        location: &LocationHandle,
        destination: &Path,
    ) -> Result<(), ClientError>;
}

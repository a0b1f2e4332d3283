// Tinify API client: uploads a JPEG to `/shrink` and downloads the compressed result.

use std::path::Path;
use std::sync::Once;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use super::{Compressor, LocationHandle};
use crate::config::ClientConfig;
use crate::error::ClientError;

const API_USER: &str = "api";

/// rustls is built without a default provider; pick aws-lc-rs once per process
/// unless the host application already chose one.
fn ensure_crypto_provider() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if rustls::crypto::CryptoProvider::get_default().is_some() {
            return;
        }
        if rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider was installed concurrently");
        }
    });
}

/// Size and dimensions of an image as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageInfo {
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub ratio: f32,
    pub url: String,
}

/// Parsed response of a `/shrink` request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompressionReport {
    pub input: ImageInfo,
    pub output: ImageInfo,
    /// Compressions made with this key this month (`Compression-Count` header).
    #[serde(skip)]
    pub compression_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct PreserveBody<'a> {
    preserve: &'a [String],
}

/// HTTP client for the Tinify compression API.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct TinifyClient {
    http_client: Client,
    config: ClientConfig,
}

impl TinifyClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::configuration("cannot use an empty API key"));
        }

        ensure_crypto_provider();

        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout);
        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| ClientError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Upload `source` and return the location handle with the parsed report.
    #[instrument(skip(self), fields(file = %source.display()))]
    pub async fn shrink(
        &self,
        source: &Path,
    ) -> Result<(LocationHandle, CompressionReport), ClientError> {
        let body = tokio::fs::read(source)
            .await
            .map_err(|e| ClientError::io(source, e))?;

        let response = self
            .http_client
            .post(self.config.shrink_url())
            .basic_auth(API_USER, Some(&self.config.api_key))
            .body(body)
            .send()
            .await?;
        let response = check_status(response, "compress").await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(LocationHandle::new)
            .ok_or(ClientError::MissingLocation {
                operation: "compress",
            })?;

        let compression_count = response
            .headers()
            .get("Compression-Count")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());

        let bytes = response.bytes().await?;
        let mut report: CompressionReport = serde_json::from_slice(&bytes).unwrap_or_default();
        report.compression_count = compression_count;

        debug!(
            location = %location,
            input_size = report.input.size,
            output_size = report.output.size,
            ratio = report.output.ratio,
            compression_count = ?report.compression_count,
            "Image compressed"
        );

        Ok((location, report))
    }
}

#[async_trait]
impl Compressor for TinifyClient {
    async fn compress(&self, source: &Path) -> Result<LocationHandle, ClientError> {
        self.shrink(source).await.map(|(location, _)| location)
    }

    #[instrument(skip(self), fields(location = %location, file = %destination.display()))]
    async fn download(
        &self,
        location: &LocationHandle,
        destination: &Path,
    ) -> Result<(), ClientError> {
        if location.as_str().is_empty() {
            return Err(ClientError::configuration(
                "path to location of resulting image cannot be empty",
            ));
        }

        let response = self
            .http_client
            .post(location.as_str())
            .basic_auth(API_USER, Some(&self.config.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&PreserveBody {
                preserve: &self.config.preserve,
            })
            .send()
            .await?;
        let response = check_status(response, "download").await?;

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| ClientError::io(destination, e))?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ClientError::io(destination, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| ClientError::io(destination, e))?;

        debug!(bytes = written, "Compressed image written");
        Ok(())
    }
}

/// Turn non-2xx responses into [`ClientError::HttpStatus`], using the API's error body.
async fn check_status(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => format!("{}: {}", api_error.error, api_error.message),
        Err(_) => body,
    };
    Err(ClientError::http_status(status, operation, message))
}

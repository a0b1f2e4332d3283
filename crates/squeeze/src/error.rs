use std::path::PathBuf;

use reqwest::StatusCode;

/// Errors raised by the remote compression client.
///
/// Every variant counts as one failed attempt in the unit pipeline; the
/// [`is_retryable`](ClientError::is_retryable) hint is only reported.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} during {operation}: {message}")]
    HttpStatus {
        status: StatusCode,
        operation: &'static str,
        message: String,
    },

    #[error("response to {operation} carried no Location header")]
    MissingLocation { operation: &'static str },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn http_status(
        status: StatusCode,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::HttpStatus {
            status,
            operation,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a later attempt has a realistic chance to succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Configuration { .. } | Self::MissingLocation { .. } => false,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Network { source } => {
                source.is_connect() || source.is_timeout() || source.is_request() || source.is_body()
            }
            Self::Io { .. } => true,
        }
    }
}

/// Errors raised while restoring metadata on a compressed file.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Conditions that stop a batch before any file is processed.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("folder path is empty")]
    EmptyFolderPath,

    #[error("couldn't read folder {}: {source}", path.display())]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't create output folder {}: {source}", path.display())]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input file {}: {reason}", path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl BatchError {
    pub fn invalid_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

use squeeze_engine::{BatchError, ClientError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing Tinify API key: pass --apikey or set TINIFY_API_KEY (a .env file works too)")]
    MissingApiKey,

    #[error("couldn't set up the Tinify client: {0}")]
    Client(#[from] ClientError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

use std::time::Duration;

use crate::retry::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://api.tinify.com";

pub const DEFAULT_USER_AGENT: &str = concat!("squeeze/", env!("CARGO_PKG_VERSION"));

/// Metadata categories the remote service is asked to keep on download.
pub const DEFAULT_PRESERVE: &[&str] = &["copyright", "creation", "location"];

/// Settings for one batch run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Maximum number of pipelines in flight. Values <= 1 run sequentially.
    pub max_concurrency: usize,
    /// Additional compress/download attempts after the first one.
    pub max_retries: u32,
    /// Delay schedule between attempts.
    pub retry: RetryPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            max_retries: 2,
            retry: RetryPolicy::default(),
        }
    }
}

impl RunConfig {
    pub fn new(max_concurrency: usize, max_retries: u32) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Total number of compress/download attempts per file.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn is_sequential(&self) -> bool {
        self.max_concurrency <= 1
    }
}

/// Configuration of the remote compression client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key, sent as the password of HTTP basic auth with user `api`.
    pub api_key: String,

    /// Base URL of the service; `/shrink` is appended for uploads.
    pub base_url: String,

    /// Overall timeout for one request. Zero disables it.
    pub timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    pub user_agent: String,

    /// Metadata categories requested when downloading the result.
    pub preserve: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_API_URL.to_owned(),
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            preserve: DEFAULT_PRESERVE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ClientConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn shrink_url(&self) -> String {
        format!("{}/shrink", self.base_url.trim_end_matches('/'))
    }
}

//! HTTP fetch abstraction.
//!
//! Performers and crawl strategies never talk to `reqwest` directly; they go
//! through [`HttpFetch`], which lets tests substitute `testing::MockFetcher`.

mod reqwest_fetcher;

pub use reqwest_fetcher::ReqwestFetcher;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Browser-like user agent used when none is configured.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Errors that can occur while fetching a page.
///
/// The performer treats every variant the same way ("this fetch failed"); the
/// distinction is kept for logs and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request timeout")]
    Timeout,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Status(_) => "status",
            FetchError::Transport(_) => "transport",
            FetchError::InvalidUrl(_) => "invalid_url",
        }
    }
}

/// Timeout-bounded GET returning the body as text.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<String, FetchError>;
}

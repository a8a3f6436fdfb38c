//! Mock HTTP fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::fetch::{FetchError, HttpFetch};

/// A recorded fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    /// The requested URL.
    pub url: String,
    /// User agent sent with the request.
    pub user_agent: String,
    /// Timeout the caller asked for.
    pub timeout: Duration,
    /// When the fetch was made.
    pub timestamp: Instant,
}

/// Called with each requested URL after it is recorded.
type FetchHook = Box<dyn Fn(&str) + Send + Sync>;

/// Mock implementation of the HttpFetch trait.
///
/// Provides controllable behavior for testing:
/// - Map URLs to canned bodies or errors (unknown URLs answer HTTP 404)
/// - Track requests for assertions
/// - Simulate slow responses
/// - Run a hook on every request (e.g. to stop a performer mid-run)
///
/// # Example
///
/// ```rust,ignore
/// use dragnet_core::testing::MockFetcher;
///
/// let fetcher = MockFetcher::new();
/// fetcher.respond("https://site.example/search/ubuntu/1/", "<html>...</html>").await;
/// fetcher.fail("https://site.example/torrent/1/", FetchError::Timeout).await;
///
/// // Run a performer...
///
/// assert_eq!(fetcher.request_count().await, 2);
/// ```
pub struct MockFetcher {
    /// Configured responses by exact URL.
    routes: Arc<RwLock<HashMap<String, Result<String, FetchError>>>>,
    /// Recorded requests.
    requests: Arc<RwLock<Vec<RecordedFetch>>>,
    /// Simulated latency per request.
    delay: Arc<RwLock<Duration>>,
    /// Hook run on every request.
    hook: Arc<RwLock<Option<FetchHook>>>,
}

impl std::fmt::Debug for MockFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFetcher")
            .field("routes", &"<routes>")
            .field("requests", &"<requests>")
            .field("delay", &"<delay>")
            .field("hook", &"<hook>")
            .finish()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher with no routes.
    pub fn new() -> Self {
        Self {
            routes: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            hook: Arc::new(RwLock::new(None)),
        }
    }

    /// Answer `url` with `body`.
    pub async fn respond(&self, url: &str, body: impl Into<String>) {
        self.routes
            .write()
            .await
            .insert(url.to_string(), Ok(body.into()));
    }

    /// Answer `url` with `error`.
    pub async fn fail(&self, url: &str, error: FetchError) {
        self.routes.write().await.insert(url.to_string(), Err(error));
    }

    /// Delay every response by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Run `hook` with the URL of every request, before it is answered.
    pub async fn on_fetch(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.hook.write().await = Some(Box::new(hook));
    }

    /// Get all recorded requests.
    pub async fn recorded_requests(&self) -> Vec<RecordedFetch> {
        self.requests.read().await.clone()
    }

    /// Requested URLs in order.
    pub async fn requested_urls(&self) -> Vec<String> {
        self.requests
            .read()
            .await
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    /// Get the number of requests made.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Clear recorded requests.
    pub async fn clear_recorded(&self) {
        self.requests.write().await.clear();
    }
}

#[async_trait]
impl HttpFetch for MockFetcher {
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<String, FetchError> {
        self.requests.write().await.push(RecordedFetch {
            url: url.to_string(),
            user_agent: user_agent.to_string(),
            timeout,
            timestamp: Instant::now(),
        });

        if let Some(hook) = self.hook.read().await.as_ref() {
            hook(url);
        }

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(FetchError::Timeout);
            }
            tokio::time::sleep(delay).await;
        }

        self.routes
            .read()
            .await
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchError::Status(404)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_routes_and_recording() {
        let fetcher = MockFetcher::new();
        fetcher.respond("https://a.example/", "body").await;
        fetcher.fail("https://b.example/", FetchError::Timeout).await;

        let timeout = Duration::from_secs(1);
        assert_eq!(
            fetcher.fetch("https://a.example/", timeout, "ua").await,
            Ok("body".to_string())
        );
        assert_eq!(
            fetcher.fetch("https://b.example/", timeout, "ua").await,
            Err(FetchError::Timeout)
        );
        assert_eq!(
            fetcher.fetch("https://c.example/", timeout, "ua").await,
            Err(FetchError::Status(404))
        );

        let recorded = fetcher.recorded_requests().await;
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[0].user_agent, "ua");
        assert_eq!(recorded[2].url, "https://c.example/");
    }

    #[tokio::test]
    async fn test_delay_longer_than_timeout() {
        let fetcher = MockFetcher::new();
        fetcher.respond("https://a.example/", "body").await;
        fetcher.set_delay(Duration::from_millis(200)).await;

        let result = fetcher
            .fetch("https://a.example/", Duration::from_millis(10), "ua")
            .await;
        assert_eq!(result, Err(FetchError::Timeout));
    }
}

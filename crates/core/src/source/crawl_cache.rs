//! Shared cache of fetched detail pages.
//!
//! Pages are stored under their URL and under the info hash they resolved
//! to, since the same torrent often shows up on several sources. URLs whose
//! fetch failed are remembered for a while so a flaky page is not retried on
//! every search.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

/// How long a failed detail URL is skipped.
pub const FAILED_URL_LIFETIME: Duration = Duration::from_secs(600);

const DEFAULT_CAPACITY: usize = 1024;

#[async_trait]
pub trait CrawlCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn put(&self, key: &str, body: &str);
    async fn remove(&self, key: &str);
    async fn mark_failed(&self, url: &str);
    /// True while a failure recorded for `url` is still fresh.
    async fn is_failed(&self, url: &str) -> bool;
}

#[derive(Default)]
struct Entries {
    pages: HashMap<String, String>,
    order: VecDeque<String>,
    failed: HashMap<String, Instant>,
}

/// In-memory [`CrawlCache`] that evicts the oldest page once full.
pub struct MemoryCrawlCache {
    entries: Mutex<Entries>,
    capacity: usize,
    failed_ttl: Duration,
}

impl MemoryCrawlCache {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, FAILED_URL_LIFETIME)
    }

    pub fn with_limits(capacity: usize, failed_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity: capacity.max(1),
            failed_ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.pages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCrawlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CrawlCache for MemoryCrawlCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.pages.get(key).cloned()
    }

    async fn put(&self, key: &str, body: &str) {
        let mut entries = self.entries.lock().await;
        if entries
            .pages
            .insert(key.to_string(), body.to_string())
            .is_none()
        {
            entries.order.push_back(key.to_string());
        }
        while entries.pages.len() > self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.pages.remove(&oldest);
                }
                None => break,
            }
        }
    }

    async fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        if entries.pages.remove(key).is_some() {
            entries.order.retain(|k| k != key);
        }
    }

    async fn mark_failed(&self, url: &str) {
        self.entries
            .lock()
            .await
            .failed
            .insert(url.to_string(), Instant::now());
    }

    async fn is_failed(&self, url: &str) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.failed.get(url) {
            Some(when) if when.elapsed() < self.failed_ttl => true,
            Some(_) => {
                entries.failed.remove(url);
                false
            }
            None => false,
        }
    }
}

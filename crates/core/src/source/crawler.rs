//! Detail-page crawl strategy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::fetch::HttpFetch;
use crate::metrics::record_fetch;
use crate::performer::StopFlag;
use crate::result::SearchResult;

use super::{CrawlCache, CrawlStrategy, DetailParser};

/// Crawl strategy that fetches each preliminary result's details URL and
/// hands the page to a [`DetailParser`].
///
/// Only the first `budget` crawlable results are fetched. Up to `fanout`
/// detail pages are in flight at once and output keeps listing order.
/// With a [`CrawlCache`] attached, cached pages are reused and recently
/// failed URLs are skipped.
pub struct DetailPageCrawler<P> {
    source: String,
    fetcher: Arc<dyn HttpFetch>,
    parser: P,
    timeout: Duration,
    user_agent: String,
    fanout: usize,
    cache: Option<Arc<dyn CrawlCache>>,
}

impl<P: DetailParser> DetailPageCrawler<P> {
    pub fn new(
        source: impl Into<String>,
        fetcher: Arc<dyn HttpFetch>,
        parser: P,
        timeout: Duration,
        user_agent: impl Into<String>,
        fanout: usize,
    ) -> Self {
        Self {
            source: source.into(),
            fetcher,
            parser,
            timeout,
            user_agent: user_agent.into(),
            fanout: fanout.max(1),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CrawlCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn cached_page(&self, url: &str, info_hash: Option<&str>) -> Option<String> {
        let cache = self.cache.as_ref()?;
        if let Some(body) = cache.get(url).await {
            return Some(body);
        }
        cache.get(info_hash?).await
    }

    async fn crawl_one(&self, preliminary: SearchResult, stop: &StopFlag) -> Option<SearchResult> {
        if stop.is_stopped() {
            return None;
        }
        let url = preliminary.details_url()?;

        if let Some(cache) = &self.cache {
            if cache.is_failed(url).await {
                debug!(source = %self.source, url = %url, "Skipping recently failed detail page");
                return None;
            }
        }

        let body = match self.cached_page(url, preliminary.info_hash()).await {
            Some(body) => body,
            None => {
                let started = Instant::now();
                let fetched = self.fetcher.fetch(url, self.timeout, &self.user_agent).await;
                record_fetch("detail", started, fetched.is_ok());

                match fetched {
                    Ok(body) => body,
                    Err(e) => {
                        debug!(source = %self.source, url = %url, error = %e, "Detail fetch failed");
                        if let Some(cache) = &self.cache {
                            cache.mark_failed(url).await;
                        }
                        return None;
                    }
                }
            }
        };

        let crawled = self.parser.parse_detail(&preliminary, &body);
        if let Some(cache) = &self.cache {
            match crawled.as_ref().and_then(|r| r.info_hash()) {
                Some(hash) => {
                    cache.put(url, &body).await;
                    cache.put(hash, &body).await;
                }
                None => cache.remove(url).await,
            }
        }
        crawled
    }
}

#[async_trait]
impl<P: DetailParser + 'static> CrawlStrategy for DetailPageCrawler<P> {
    async fn crawl(
        &self,
        preliminary: Vec<SearchResult>,
        budget: usize,
        stop: &StopFlag,
    ) -> Vec<SearchResult> {
        let queue: Vec<SearchResult> = preliminary
            .into_iter()
            .filter(|r| r.details_url().is_some())
            .take(budget)
            .collect();
        if queue.is_empty() {
            return Vec::new();
        }

        let queued = queue.len();
        let crawled: Vec<SearchResult> = stream::iter(queue)
            .map(|item| self.crawl_one(item, stop))
            .buffered(self.fanout)
            .filter_map(future::ready)
            .filter(|result| future::ready(result.is_complete()))
            .collect()
            .await;

        debug!(
            source = %self.source,
            queued,
            crawled = crawled.len(),
            "Detail crawl finished"
        );
        crawled
    }
}

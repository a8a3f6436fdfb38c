//! Paged listing performer.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::fetch::HttpFetch;
use crate::metrics::{record_fetch, PERFORMER_RUNS, RESULTS_EMITTED};
use crate::result::SearchResult;
use crate::source::{CrawlStrategy, ParseStrategy};

use super::{
    PerformOutcome, PerformerError, PerformerOptions, PerformerState, QueryToken, ResultListener,
    SearchPerformer, StopFlag, StopReason,
};

/// Runs one query against one source: fetches listing pages, parses them,
/// crawls preliminary results and emits one batch per page.
///
/// Not reusable: `perform()` runs at most once.
pub struct Performer {
    token: QueryToken,
    keywords: String,
    encoded_keywords: String,
    parse: Arc<dyn ParseStrategy>,
    crawl: Option<Arc<dyn CrawlStrategy>>,
    fetcher: Arc<dyn HttpFetch>,
    listener: Arc<dyn ResultListener>,
    options: PerformerOptions,
    state: AtomicU8,
    stop: StopFlag,
}

/// Mutable bookkeeping for one run.
struct RunState {
    seen: HashSet<String>,
    emitted: usize,
    crawl_budget: usize,
}

impl Performer {
    pub fn new(
        token: QueryToken,
        keywords: impl Into<String>,
        parse: Arc<dyn ParseStrategy>,
        crawl: Option<Arc<dyn CrawlStrategy>>,
        fetcher: Arc<dyn HttpFetch>,
        listener: Arc<dyn ResultListener>,
        options: PerformerOptions,
    ) -> Self {
        let keywords = keywords.into();
        let encoded_keywords = urlencoding::encode(keywords.trim()).into_owned();
        Self {
            token,
            keywords,
            encoded_keywords,
            parse,
            crawl,
            fetcher,
            listener,
            options,
            state: AtomicU8::new(PerformerState::Created.as_u8()),
            stop: StopFlag::new(),
        }
    }

    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    /// A clone of the cancellation flag, for callers that outlive a borrow.
    pub fn stop_handle(&self) -> StopFlag {
        self.stop.clone()
    }

    fn cancelled(&self, run: &RunState) -> PerformOutcome {
        PerformOutcome::Stopped {
            emitted: run.emitted,
            reason: StopReason::Cancelled,
        }
    }

    async fn run(&self) -> PerformOutcome {
        let source = self.parse.name();
        let mut run = RunState {
            seen: HashSet::new(),
            emitted: 0,
            crawl_budget: self.options.crawl_budget,
        };

        for page in 1..=self.options.max_pages.max(1) {
            if self.stop.is_stopped() {
                return self.cancelled(&run);
            }
            if run.emitted >= self.options.max_results {
                break;
            }

            let url = self.parse.search_url(&self.encoded_keywords, page);
            debug!(source = %source, page, url = %url, "Fetching listing page");

            let started = Instant::now();
            let fetched = self
                .fetcher
                .fetch(&url, self.options.timeout, &self.options.user_agent)
                .await;
            record_fetch("listing", started, fetched.is_ok());

            let body = match fetched {
                Ok(body) => body,
                Err(e) => {
                    warn!(source = %source, page, error = %e, "Listing fetch failed");
                    return PerformOutcome::Stopped {
                        emitted: run.emitted,
                        reason: StopReason::FetchFailed(e.to_string()),
                    };
                }
            };

            let mut parsed = self.parse.parse_results(&body);
            let parsed_count = parsed.len();
            parsed.truncate(self.parse.max_results());

            let room = self.options.max_results.saturating_sub(run.emitted);
            let mut batch = self.complete_page(parsed, room, &mut run).await;
            batch.truncate(room);

            if self.stop.is_stopped() {
                return self.cancelled(&run);
            }

            debug!(
                source = %source,
                page,
                parsed = parsed_count,
                emitted = batch.len(),
                "Listing page processed"
            );
            if !batch.is_empty() {
                run.emitted += batch.len();
                RESULTS_EMITTED
                    .with_label_values(&[source])
                    .inc_by(batch.len() as u64);
                self.listener.on_results(self.token, source, batch);
            }

            if !self.parse.has_next_page(page, &body, parsed_count) {
                break;
            }
        }

        PerformOutcome::Finished {
            emitted: run.emitted,
        }
    }

    /// De-duplicate a parsed page against the run, crawl its preliminary
    /// entries and return only complete results, in listing order.
    ///
    /// Only preliminary entries among the first `room` fresh rows are
    /// crawled; rows past that can never be emitted.
    async fn complete_page(
        &self,
        parsed: Vec<SearchResult>,
        room: usize,
        run: &mut RunState,
    ) -> Vec<SearchResult> {
        let fresh: Vec<SearchResult> = parsed
            .into_iter()
            .filter(|r| run.seen.insert(r.dedup_key()))
            .collect();

        let preliminary: Vec<SearchResult> = fresh
            .iter()
            .take(room)
            .filter(|r| r.is_preliminary())
            .cloned()
            .collect();

        let mut crawled: HashMap<String, SearchResult> = HashMap::new();
        if !preliminary.is_empty() {
            match &self.crawl {
                Some(crawl) if run.crawl_budget > 0 => {
                    let budget = run.crawl_budget;
                    let queued = preliminary
                        .iter()
                        .filter(|r| r.details_url().is_some())
                        .count()
                        .min(budget);
                    run.crawl_budget -= queued;

                    for result in crawl.crawl(preliminary, budget, &self.stop).await {
                        if let Some(url) = result.details_url() {
                            crawled.insert(url.to_string(), result);
                        }
                    }
                }
                Some(_) => {
                    debug!(
                        source = %self.parse.name(),
                        skipped = preliminary.len(),
                        "Crawl budget exhausted"
                    );
                }
                None => {
                    warn!(
                        source = %self.parse.name(),
                        dropped = preliminary.len(),
                        "Preliminary results without a crawl strategy"
                    );
                }
            }
        }

        let mut batch = Vec::with_capacity(fresh.len());
        for result in fresh {
            if result.is_complete() {
                batch.push(result);
                continue;
            }
            let enriched = result
                .details_url()
                .and_then(|url| crawled.remove(url))
                .filter(|r| r.is_complete());
            if let Some(enriched) = enriched {
                if run.seen.insert(enriched.dedup_key()) {
                    batch.push(enriched);
                }
            }
        }
        batch
    }

    fn finish(&self, outcome: &PerformOutcome) {
        let final_state = match outcome {
            PerformOutcome::Finished { .. } if !self.stop.is_stopped() => PerformerState::Finished,
            _ => PerformerState::Stopped,
        };
        self.state.store(final_state.as_u8(), Ordering::SeqCst);
        PERFORMER_RUNS.with_label_values(&[outcome.label()]).inc();
    }
}

#[async_trait]
impl SearchPerformer for Performer {
    fn token(&self) -> QueryToken {
        self.token
    }

    fn source(&self) -> &str {
        self.parse.name()
    }

    async fn perform(&self) -> Result<PerformOutcome, PerformerError> {
        let started = self.state.compare_exchange(
            PerformerState::Created.as_u8(),
            PerformerState::Running.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if started.is_err() {
            warn!(source = %self.source(), token = %self.token, "Performer already started");
            return Err(PerformerError::AlreadyStarted);
        }

        let outcome = self.run().await;
        self.finish(&outcome);

        info!(
            source = %self.source(),
            token = %self.token,
            outcome = outcome.label(),
            emitted = outcome.emitted(),
            "Performer finished"
        );
        Ok(outcome)
    }

    fn stop(&self) {
        self.stop.stop();
        let _ = self.state.compare_exchange(
            PerformerState::Running.as_u8(),
            PerformerState::Stopped.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    fn state(&self) -> PerformerState {
        PerformerState::from_u8(self.state.load(Ordering::SeqCst))
    }
}

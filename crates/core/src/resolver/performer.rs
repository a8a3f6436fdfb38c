//! Performer backed by the cloud resolver.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::metrics::{PERFORMER_RUNS, RESULTS_EMITTED};
use crate::performer::{
    PerformOutcome, PerformerError, PerformerState, QueryToken, ResultListener, SearchPerformer,
    StopFlag, StopReason,
};

use super::{meta_to_results, normalize_page_url, EventSource, ResolverError, ResolverEvent};

/// Source name reported before the extractor is known.
const SOURCE: &str = "Cloud";

/// Resolves one media page URL through an [`EventSource`].
///
/// Waits for events in a single loop, each receive bounded by `timeout`.
/// Results from the first `Meta` event are emitted as one batch; the run ends
/// on `Finished` or `Error`.
pub struct CloudResolverPerformer {
    token: QueryToken,
    url: String,
    events: Arc<dyn EventSource>,
    listener: Arc<dyn ResultListener>,
    timeout: Duration,
    state: AtomicU8,
    stop: StopFlag,
    stop_notify: Notify,
}

impl CloudResolverPerformer {
    pub fn new(
        token: QueryToken,
        url: &str,
        events: Arc<dyn EventSource>,
        listener: Arc<dyn ResultListener>,
        timeout: Duration,
    ) -> Self {
        Self {
            token,
            url: normalize_page_url(url.trim()),
            events,
            listener,
            timeout,
            state: AtomicU8::new(PerformerState::Created.as_u8()),
            stop: StopFlag::new(),
            stop_notify: Notify::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn failed(emitted: usize, error: ResolverError) -> PerformOutcome {
        PerformOutcome::Stopped {
            emitted,
            reason: StopReason::ResolverFailed(error.to_string()),
        }
    }

    async fn run(&self) -> PerformOutcome {
        let cancelled = |emitted| PerformOutcome::Stopped {
            emitted,
            reason: StopReason::Cancelled,
        };
        if self.stop.is_stopped() {
            return cancelled(0);
        }

        let mut rx = match self.events.start(&self.url) {
            Ok(rx) => rx,
            Err(e) => {
                warn!(url = %self.url, error = %e, "Resolver failed to start");
                return Self::failed(0, e);
            }
        };

        let mut emitted = 0;
        let mut meta_seen = false;
        loop {
            let event = tokio::select! {
                _ = self.stop_notify.notified() => return cancelled(emitted),
                received = timeout(self.timeout, rx.recv()) => received,
            };
            if self.stop.is_stopped() {
                return cancelled(emitted);
            }

            let event = match event {
                Ok(Some(event)) => event,
                Ok(None) => return Self::failed(emitted, ResolverError::ChannelClosed),
                Err(_) => {
                    warn!(url = %self.url, "Resolver timed out");
                    return Self::failed(emitted, ResolverError::Timeout(self.timeout.as_secs()));
                }
            };

            match event {
                ResolverEvent::Progress { percent, .. } => {
                    debug!(url = %self.url, percent, "Resolver progress");
                }
                ResolverEvent::Destination { filename } => {
                    debug!(url = %self.url, filename = %filename, "Resolver destination");
                }
                ResolverEvent::Meta { json } if !meta_seen => {
                    meta_seen = true;
                    let results = match meta_to_results(&json) {
                        Ok(results) => results,
                        Err(e) => {
                            warn!(url = %self.url, error = %e, "Unusable resolver metadata");
                            return Self::failed(emitted, e);
                        }
                    };
                    if let Some(first) = results.first() {
                        let source = first.source().to_string();
                        emitted = results.len();
                        RESULTS_EMITTED
                            .with_label_values(&[source.as_str()])
                            .inc_by(emitted as u64);
                        self.listener.on_results(self.token, &source, results);
                    }
                }
                ResolverEvent::Meta { .. } => {
                    debug!(url = %self.url, "Ignoring repeated resolver metadata");
                }
                ResolverEvent::Error { message } => {
                    warn!(url = %self.url, error = %message, "Resolver reported an error");
                    return Self::failed(emitted, ResolverError::Process(message));
                }
                ResolverEvent::Finished { exit_code } => {
                    if exit_code != 0 && emitted == 0 {
                        return Self::failed(
                            emitted,
                            ResolverError::Process(format!("exit code {}", exit_code)),
                        );
                    }
                    return PerformOutcome::Finished { emitted };
                }
            }
        }
    }
}

#[async_trait]
impl SearchPerformer for CloudResolverPerformer {
    fn token(&self) -> QueryToken {
        self.token
    }

    fn source(&self) -> &str {
        SOURCE
    }

    async fn perform(&self) -> Result<PerformOutcome, PerformerError> {
        let started = self.state.compare_exchange(
            PerformerState::Created.as_u8(),
            PerformerState::Running.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if started.is_err() {
            return Err(PerformerError::AlreadyStarted);
        }

        let outcome = self.run().await;
        let final_state = match outcome {
            PerformOutcome::Finished { .. } => PerformerState::Finished,
            PerformOutcome::Stopped { .. } => PerformerState::Stopped,
        };
        self.state.store(final_state.as_u8(), Ordering::SeqCst);
        PERFORMER_RUNS.with_label_values(&[outcome.label()]).inc();

        info!(
            url = %self.url,
            token = %self.token,
            outcome = outcome.label(),
            emitted = outcome.emitted(),
            "Resolver performer finished"
        );
        Ok(outcome)
    }

    fn stop(&self) {
        self.stop.stop();
        self.stop_notify.notify_one();
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

//! Result delivery from performers to their caller.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::result::SearchResult;

use super::{PerformOutcome, PerformerError, PerformerState, QueryToken};

/// Receives result batches from a performer, in page order.
pub trait ResultListener: Send + Sync {
    fn on_results(&self, token: QueryToken, source: &str, batch: Vec<SearchResult>);
}

/// Signals merged from every performer of every query.
#[derive(Debug, Clone)]
pub enum SearchSignal {
    Results {
        token: QueryToken,
        source: String,
        batch: Vec<SearchResult>,
    },
    /// No performer for this token is still running.
    End { token: QueryToken },
}

impl SearchSignal {
    pub fn token(&self) -> QueryToken {
        match self {
            SearchSignal::Results { token, .. } | SearchSignal::End { token } => *token,
        }
    }
}

/// Listener forwarding batches into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<SearchSignal>,
}

impl ChannelListener {
    pub fn new(tx: mpsc::UnboundedSender<SearchSignal>) -> Self {
        Self { tx }
    }
}

impl ResultListener for ChannelListener {
    fn on_results(&self, token: QueryToken, source: &str, batch: Vec<SearchResult>) {
        let signal = SearchSignal::Results {
            token,
            source: source.to_string(),
            batch,
        };
        if self.tx.send(signal).is_err() {
            tracing::debug!(token = %token, source = %source, "Result receiver dropped");
        }
    }
}

/// What the dispatcher needs from any performer.
#[async_trait]
pub trait SearchPerformer: Send + Sync {
    fn token(&self) -> QueryToken;

    /// Identifier of the source this performer queries.
    fn source(&self) -> &str;

    /// Run the search. Runs at most once.
    async fn perform(&self) -> Result<PerformOutcome, PerformerError>;

    /// Idempotent cooperative stop.
    fn stop(&self);

    fn is_stopped(&self) -> bool;

    fn state(&self) -> PerformerState;
}

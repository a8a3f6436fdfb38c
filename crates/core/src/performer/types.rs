//! Types shared by performers, strategies and the dispatcher.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::fetch::DEFAULT_USER_AGENT;

/// Caller-issued identifier for one logical user query.
///
/// Compared by equality only; lets a caller discard callbacks that belong to
/// a superseded query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryToken(Uuid);

impl QueryToken {
    /// A fresh random token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QueryToken {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for QueryToken {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for QueryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Cooperative cancellation flag.
///
/// Cheap to clone; all clones observe the same flag. Setting it guarantees no
/// new network call starts afterwards, but in-flight calls may complete.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of a performer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformerState {
    Created,
    Running,
    Stopped,
    Finished,
}

impl PerformerState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            PerformerState::Created => 0,
            PerformerState::Running => 1,
            PerformerState::Stopped => 2,
            PerformerState::Finished => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => PerformerState::Created,
            1 => PerformerState::Running,
            2 => PerformerState::Stopped,
            _ => PerformerState::Finished,
        }
    }
}

/// How a `perform()` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerformOutcome {
    /// Every page was processed (or a natural limit was hit).
    Finished { emitted: usize },
    /// The run ended early: cancelled, or a listing fetch failed.
    Stopped { emitted: usize, reason: StopReason },
}

impl PerformOutcome {
    pub fn emitted(&self) -> usize {
        match self {
            PerformOutcome::Finished { emitted } | PerformOutcome::Stopped { emitted, .. } => {
                *emitted
            }
        }
    }

    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            PerformOutcome::Finished { .. } => "finished",
            PerformOutcome::Stopped {
                reason: StopReason::Cancelled,
                ..
            } => "cancelled",
            PerformOutcome::Stopped { .. } => "failed",
        }
    }
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    FetchFailed(String),
    ResolverFailed(String),
}

/// Errors returned by `perform()` itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PerformerError {
    #[error("Performer already started")]
    AlreadyStarted,
}

/// Knobs for one performer run.
#[derive(Debug, Clone)]
pub struct PerformerOptions {
    /// Per-request timeout for listing and detail pages.
    pub timeout: Duration,
    /// Maximum results emitted across all pages.
    pub max_results: usize,
    /// Maximum listing pages fetched.
    pub max_pages: u32,
    /// Maximum detail-page fetches across the whole run.
    pub crawl_budget: usize,
    pub user_agent: String,
}

impl Default for PerformerOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_results: 50,
            max_pages: 1,
            crawl_budget: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_compare_by_equality() {
        let a = QueryToken::new();
        let b = QueryToken::new();
        assert_eq!(a, a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_stop_flag_shared_between_clones() {
        let flag = StopFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_stopped());
        flag.stop();
        flag.stop();
        assert!(clone.is_stopped());
    }

    #[test]
    fn test_state_roundtrip() {
        for state in [
            PerformerState::Created,
            PerformerState::Running,
            PerformerState::Stopped,
            PerformerState::Finished,
        ] {
            assert_eq!(PerformerState::from_u8(state.as_u8()), state);
        }
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(PerformOutcome::Finished { emitted: 3 }.label(), "finished");
        let cancelled = PerformOutcome::Stopped {
            emitted: 1,
            reason: StopReason::Cancelled,
        };
        assert_eq!(cancelled.label(), "cancelled");
        assert_eq!(cancelled.emitted(), 1);
        let failed = PerformOutcome::Stopped {
            emitted: 0,
            reason: StopReason::FetchFailed("HTTP 503".into()),
        };
        assert_eq!(failed.label(), "failed");
    }
}

//! Strategy traits implemented by source adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::performer::StopFlag;
use crate::result::{SearchResult, ValidationError};

/// An adapter could not be constructed from its configuration.
///
/// Fatal for that adapter only; it is surfaced to the operator and the source
/// is left out of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyConfigError {
    #[error("Source {adapter}: invalid {field} pattern: {message}")]
    InvalidPattern {
        adapter: String,
        field: String,
        message: String,
    },

    #[error("Source {adapter}: pattern is missing required group `{group}`")]
    MissingGroup { adapter: String, group: String },

    #[error("Source {adapter}: invalid URL template: {message}")]
    InvalidUrlTemplate { adapter: String, message: String },

    #[error("Source {adapter}: {message}")]
    Invalid { adapter: String, message: String },
}

/// Why one listing record was skipped. Never escapes `parse_results`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordParseError {
    #[error("record is not an object")]
    NotAnObject,

    #[error("record has no {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Single-pass strategy: build a listing URL, turn the response into results.
///
/// Implementations must be deterministic: identical bodies yield identical,
/// identically ordered lists.
pub trait ParseStrategy: Send + Sync {
    /// Adapter identifier, used as every result's `source`.
    fn name(&self) -> &str;

    /// URL for a 1-based listing page. Keywords are already transport-encoded.
    fn search_url(&self, encoded_keywords: &str, page: u32) -> String;

    /// Parse a listing body. Never fails: an empty or unusable body yields an
    /// empty list and malformed records are skipped.
    fn parse_results(&self, body: &str) -> Vec<SearchResult>;

    /// Hard cap on results returned by one `parse_results` call.
    fn max_results(&self) -> usize;

    /// Whether another listing page is worth fetching after `page`.
    fn has_next_page(&self, page: u32, body: &str, parsed: usize) -> bool {
        let _ = (page, body);
        parsed > 0
    }
}

/// Two-phase enrichment of preliminary results through their detail pages.
#[async_trait]
pub trait CrawlStrategy: Send + Sync {
    /// Crawl at most `budget` results. Failed items are dropped, never
    /// retried, and never abort the rest of the queue. Every returned result
    /// is complete.
    async fn crawl(
        &self,
        preliminary: Vec<SearchResult>,
        budget: usize,
        stop: &StopFlag,
    ) -> Vec<SearchResult>;
}

/// Turns one detail page into the complete version of a preliminary result.
pub trait DetailParser: Send + Sync {
    fn parse_detail(&self, preliminary: &SearchResult, body: &str) -> Option<SearchResult>;
}

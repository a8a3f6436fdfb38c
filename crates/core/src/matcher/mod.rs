//! Named-group pattern matching for source adapters.
//!
//! Parsing code talks to `SearchPattern` / `SearchMatcher` only, so adapters
//! never depend on the regex engine's own API. Patterns are compiled once when
//! an adapter is registered; a malformed pattern is a construction error and
//! never surfaces per call.

use regex_lite::{CaptureMatches, Captures, Regex};
use thiserror::Error;

/// A pattern failed to compile.
#[derive(Debug, Clone, Error)]
#[error("Invalid pattern: {0}")]
pub struct PatternError(pub String);

/// An immutable, compiled search pattern.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    regex: Regex,
}

impl SearchPattern {
    /// Compile a pattern. Named groups use the `(?<name>...)` syntax.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        Regex::new(pattern)
            .map(|regex| Self { regex })
            .map_err(|e| PatternError(e.to_string()))
    }

    /// Start a forward-only scan over `text`.
    pub fn matcher<'p, 't>(&'p self, text: &'t str) -> SearchMatcher<'p, 't> {
        SearchMatcher {
            matches: self.regex.captures_iter(text),
            current: None,
        }
    }

    /// Whether the pattern declares a capture group with this name.
    pub fn has_group(&self, name: &str) -> bool {
        self.regex.capture_names().flatten().any(|n| n == name)
    }

    /// The pattern source text.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Stateful cursor over the matches of a pattern in one input buffer.
pub struct SearchMatcher<'p, 't> {
    matches: CaptureMatches<'p, 't>,
    current: Option<Captures<'t>>,
}

impl<'p, 't> SearchMatcher<'p, 't> {
    /// Advance to the next match. Returns `false` once the input is exhausted;
    /// the cursor never rewinds.
    pub fn find(&mut self) -> bool {
        self.current = self.matches.next();
        self.current.is_some()
    }

    /// Text captured by `name` in the current match.
    ///
    /// Returns `""` when the group did not participate, does not exist, or no
    /// match is current.
    pub fn group(&self, name: &str) -> &'t str {
        self.current
            .as_ref()
            .and_then(|caps| caps.name(name))
            .map(|m| m.as_str())
            .unwrap_or("")
    }

    /// Like [`group`](Self::group) but trimmed, with empty mapped to `None`.
    pub fn group_opt(&self, name: &str) -> Option<&'t str> {
        let value = self.group(name).trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

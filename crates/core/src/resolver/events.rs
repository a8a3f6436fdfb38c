//! Line-oriented events emitted by the resolver process.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// One parsed line of resolver output.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolverEvent {
    Progress {
        percent: f32,
        size: f32,
        size_unit: String,
        rate: f32,
        rate_unit: String,
        eta: String,
    },
    Destination {
        filename: String,
    },
    /// Raw metadata JSON object describing the page and its media formats.
    Meta {
        json: String,
    },
    Error {
        message: String,
    },
    /// Always the last event of a stream.
    Finished {
        exit_code: i32,
    },
}

impl ResolverEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResolverEvent::Finished { .. } | ResolverEvent::Error { .. }
        )
    }
}

static PROGRESS: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^\[download\]\s+(?<percent>[\d.]+)%\s+of\s+~?\s*(?<size>[\d.]+)\s*(?<size_unit>[KMGTP]?i?B)(?:\s+at\s+(?<rate>[\d.]+)\s*(?<rate_unit>[KMGTP]?i?B/s))?(?:\s+ETA\s+(?<eta>\S+))?",
    )
    .ok()
});

const DESTINATION_PREFIX: &str = "[download] Destination:";
const ERROR_PREFIX: &str = "ERROR:";

/// Parse one output line. Lines that carry no event yield `None`.
pub fn parse_event_line(line: &str) -> Option<ResolverEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(message) = line.strip_prefix(ERROR_PREFIX) {
        return Some(ResolverEvent::Error {
            message: message.trim().to_string(),
        });
    }

    if let Some(filename) = line.strip_prefix(DESTINATION_PREFIX) {
        return Some(ResolverEvent::Destination {
            filename: filename.trim().to_string(),
        });
    }

    if line.starts_with('{') && line.ends_with('}') {
        return serde_json::from_str::<serde_json::Value>(line)
            .ok()
            .filter(|v| v.is_object())
            .map(|_| ResolverEvent::Meta {
                json: line.to_string(),
            });
    }

    let caps = PROGRESS.as_ref()?.captures(line)?;
    let number = |name: &str| {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<f32>().ok())
            .unwrap_or(0.0)
    };
    let text = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };
    Some(ResolverEvent::Progress {
        percent: number("percent"),
        size: number("size"),
        size_unit: text("size_unit"),
        rate: number("rate"),
        rate_unit: text("rate_unit"),
        eta: text("eta"),
    })
}

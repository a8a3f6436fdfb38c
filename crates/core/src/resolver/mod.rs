//! Cloud resolver: an external process that turns a media page URL into
//! downloadable and streamable formats.
//!
//! The process reports line-oriented events; [`ProcessEventSource`] turns them
//! into a typed channel and [`CloudResolverPerformer`] consumes that channel in
//! a single loop.

mod events;
mod meta;
mod performer;
mod process;

pub use events::{parse_event_line, ResolverEvent};
pub use meta::{meta_to_results, normalize_page_url, CLOUD_SOURCE_PREFIX};
pub use performer::CloudResolverPerformer;
pub use process::{EventSource, ProcessEventSource};

use thiserror::Error;

/// Errors from a resolver run.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Failed to launch resolver {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Resolver sent no event for {0} seconds")]
    Timeout(u64),

    #[error("Resolver event stream closed before it finished")]
    ChannelClosed,

    #[error("Resolver failed: {0}")]
    Process(String),

    #[error("Invalid resolver metadata: {0}")]
    InvalidMeta(String),
}

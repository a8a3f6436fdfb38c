//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the network and process
//! seams, allowing performers and the dispatcher to be exercised without
//! real sites.
//!
//! # Example
//!
//! ```rust,ignore
//! use dragnet_core::testing::{fixtures, MockFetcher, RecordingListener};
//!
//! let fetcher = Arc::new(MockFetcher::new());
//! fetcher.respond("https://site.example/search?q=x", fixtures::json_listing(&[1, 2])).await;
//!
//! let listener = Arc::new(RecordingListener::new());
//! // Build a Performer with `fetcher` and `listener`, run it...
//! assert_eq!(listener.results().len(), 2);
//! ```

mod mock_fetcher;
mod recording_listener;
mod scripted_events;

pub use mock_fetcher::{MockFetcher, RecordedFetch};
pub use recording_listener::{RecordedBatch, RecordingListener};
pub use scripted_events::ScriptedEventSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::result::SearchResult;

    /// A deterministic 40-char hex info hash for `n`.
    pub fn info_hash(n: usize) -> String {
        format!("{:040x}", n + 1)
    }

    /// JSON listing body in the `{"torrents":[...]}` shape, one record per id.
    pub fn json_listing(ids: &[usize]) -> String {
        let items: Vec<String> = ids
            .iter()
            .map(|i| {
                format!(
                    r#"{{"name":"Item {i}","infohash":"{hash}","size_bytes":{size},"seeders":{seeds},"created_unix":1700000000}}"#,
                    i = i,
                    hash = info_hash(*i),
                    size = 1024 * 1024 * (i + 1),
                    seeds = i * 3
                )
            })
            .collect();
        format!(r#"{{"torrents":[{}]}}"#, items.join(","))
    }

    /// HTML listing with one preliminary row per id, linking `/torrent/<id>/`.
    pub fn html_listing(ids: &[usize]) -> String {
        let rows: Vec<String> = ids
            .iter()
            .map(|i| {
                format!(
                    r#"<tr><td class="name"><a href="/torrent/{i}/">Item {i}</a></td></tr>"#,
                    i = i
                )
            })
            .collect();
        format!(
            "<html><table><thead><tr><th>Name</th></tr></thead><tbody>\n{}\n</tbody></table></html>",
            rows.join("\n")
        )
    }

    /// Row pattern matching [`html_listing`].
    pub const HTML_ROW_PATTERN: &str =
        r#"<td class="name"><a href="(?<detailsurl>[^"]+)">(?<displayname>[^<]+)</a></td>"#;

    /// Detail page for `id` carrying a magnet, size and seeds.
    pub fn detail_page(id: usize) -> String {
        format!(
            r#"<html><a class="magnet" href="magnet:?xt=urn:btih:{hash}&amp;dn=Item+{id}">Magnet</a>
<li><strong>Total size</strong> <span>{id}.5 GiB</span></li>
<span class="seeds">{seeds}</span></html>"#,
            hash = info_hash(id),
            id = id,
            seeds = id + 10
        )
    }

    /// Pattern matching [`detail_page`].
    pub const DETAIL_PATTERN: &str = r#"(?s)href="(?<magnet>magnet:[^"]+)".*?Total size</strong>\s*<span>(?<size>[^<]+)</span>.*?class="seeds">(?<seeds>\d+)<"#;

    /// A complete torrent result.
    pub fn complete_result(name: &str, n: usize) -> SearchResult {
        SearchResult::builder()
            .display_name(name)
            .source("fixture")
            .info_hash(info_hash(n))
            .creation_time(1_700_000_000_000)
            .build()
            .unwrap_or_else(|e| panic!("fixture result invalid: {}", e))
    }
}

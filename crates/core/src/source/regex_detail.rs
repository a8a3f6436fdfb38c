//! Detail-page parser driven by a named-group pattern.

use tracing::debug;

use crate::matcher::SearchPattern;
use crate::normalize::{decode_html_entities, parse_torrent_date};
use crate::result::SearchResult;

use super::regex_listing::{join_url, parse_count};
use super::{DetailParser, StrategyConfigError};

/// Reads `magnet`, `infohash`, `size`, `seeds`, `creationdate`,
/// `torrenturl` and `thumbnailurl` groups from the first match on a detail
/// page. A valid info hash is required.
pub struct RegexDetailParser {
    source: String,
    pattern: SearchPattern,
    url_prefix: Option<String>,
}

impl RegexDetailParser {
    pub fn new(
        source: impl Into<String>,
        pattern: &str,
        url_prefix: Option<String>,
    ) -> Result<Self, StrategyConfigError> {
        let source = source.into();
        let pattern =
            SearchPattern::compile(pattern).map_err(|e| StrategyConfigError::InvalidPattern {
                adapter: source.clone(),
                field: "crawl.pattern".to_string(),
                message: e.to_string(),
            })?;

        if !pattern.has_group("magnet") && !pattern.has_group("infohash") {
            return Err(StrategyConfigError::MissingGroup {
                adapter: source,
                group: "magnet|infohash".to_string(),
            });
        }

        Ok(Self {
            source,
            pattern,
            url_prefix,
        })
    }
}

impl DetailParser for RegexDetailParser {
    fn parse_detail(&self, preliminary: &SearchResult, body: &str) -> Option<SearchResult> {
        let mut matcher = self.pattern.matcher(body);
        if !matcher.find() {
            debug!(
                source = %self.source,
                url = ?preliminary.details_url(),
                "Detail pattern did not match"
            );
            return None;
        }

        let prefix = self.url_prefix.as_deref();
        let mut builder = preliminary.to_builder().complete().require_hash();

        if let Some(magnet) = matcher.group_opt("magnet") {
            builder = builder.magnet_uri(decode_html_entities(magnet));
        }
        if let Some(hash) = matcher.group_opt("infohash") {
            builder = builder.info_hash(hash);
        }
        if let Some(size) = matcher.group_opt("size") {
            builder = builder.size_text(size);
        }
        if let Some(seeds) = matcher.group_opt("seeds") {
            builder = builder.seeds(parse_count(seeds));
        }
        // An unreadable date keeps the listing's time.
        if let Some(ms) = matcher.group_opt("creationdate").and_then(parse_torrent_date) {
            builder = builder.creation_time(ms);
        }
        if let Some(url) = matcher.group_opt("torrenturl") {
            builder = builder.torrent_url(join_url(prefix, url));
        }
        if let Some(url) = matcher.group_opt("thumbnailurl") {
            builder = builder.thumbnail_url(join_url(prefix, url));
        }

        match builder.build() {
            Ok(result) => Some(result),
            Err(e) => {
                debug!(source = %self.source, error = %e, "Detail page rejected");
                None
            }
        }
    }
}

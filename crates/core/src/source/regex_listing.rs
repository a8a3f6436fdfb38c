//! HTML listing adapter driven by a named-group pattern.

use chrono::Utc;
use tracing::debug;

use crate::config::RegexListingConfig;
use crate::matcher::{SearchMatcher, SearchPattern};
use crate::metrics::RECORDS_SKIPPED;
use crate::normalize::{decode_html_entities, parse_relative_age};
use crate::result::SearchResult;

use super::{ParseStrategy, RecordParseError, StrategyConfigError, UrlTemplate};

/// Groups that can make a row usable beyond its name.
const LOCATOR_GROUPS: &[&str] = &["detailsurl", "magneturl", "infohash"];

/// Parse strategy for HTML result tables.
///
/// Each pattern match is one row. Rows carrying a magnet or hash are complete;
/// rows with only a name and a details URL come out preliminary and need a
/// crawl strategy to become usable.
pub struct RegexListingSource {
    name: String,
    url: UrlTemplate,
    pattern: SearchPattern,
    alt_pattern: Option<SearchPattern>,
    config: RegexListingConfig,
    max_results: usize,
}

impl RegexListingSource {
    pub fn new(
        name: impl Into<String>,
        search_url: &str,
        config: RegexListingConfig,
        max_results: usize,
    ) -> Result<Self, StrategyConfigError> {
        let name = name.into();
        let url = UrlTemplate::parse(&name, search_url)?;
        let pattern = compile_row_pattern(&name, "pattern", &config.pattern)?;
        let alt_pattern = config
            .alt_pattern
            .as_deref()
            .map(|alt| compile_row_pattern(&name, "alt_pattern", alt))
            .transpose()?;

        Ok(Self {
            name,
            url,
            pattern,
            alt_pattern,
            config,
            max_results,
        })
    }

    /// Whether rows can only come out preliminary, so a crawl is mandatory.
    pub fn needs_crawl(&self) -> bool {
        let locates = |p: &SearchPattern| p.has_group("magneturl") || p.has_group("infohash");
        !locates(&self.pattern) && !self.alt_pattern.as_ref().is_some_and(locates)
    }

    /// The part of the page that holds result rows, or `None` when the start
    /// marker is configured but absent.
    fn results_region<'b>(&self, body: &'b str) -> Option<&'b str> {
        let mut region = body;
        if let Some(marker) = non_blank(self.config.start_marker.as_deref()) {
            let offset = region.find(marker)?;
            region = &region[offset + marker.len()..];
        }
        if let Some(marker) = non_blank(self.config.end_marker.as_deref()) {
            if let Some(offset) = region.find(marker) {
                region = &region[..offset];
            }
        }
        Some(region)
    }

    fn scan(&self, pattern: &SearchPattern, region: &str) -> Vec<SearchResult> {
        let mut results = Vec::new();
        let mut matcher = pattern.matcher(region);
        while results.len() < self.max_results && matcher.find() {
            match self.parse_row(&matcher) {
                Ok(result) => results.push(result),
                Err(e) => {
                    RECORDS_SKIPPED.with_label_values(&[self.name.as_str()]).inc();
                    debug!(source = %self.name, reason = %e, "Skipping row");
                }
            }
        }
        results
    }

    fn parse_row(&self, row: &SearchMatcher<'_, '_>) -> Result<SearchResult, RecordParseError> {
        let prefix = self.config.details_prefix.as_deref();

        let name = decode_html_entities(row.group("displayname"));
        let mut builder = SearchResult::builder()
            .display_name(name)
            .source(&self.name);

        let details_url = row.group_opt("detailsurl").map(|u| join_url(prefix, u));
        if let Some(url) = &details_url {
            builder = builder.details_url(url.as_str());
        }
        if let Some(url) = row.group_opt("thumbnailurl") {
            builder = builder.thumbnail_url(join_url(prefix, url));
        }
        if let Some(url) = row.group_opt("torrenturl") {
            builder = builder.torrent_url(join_url(prefix, url));
        }
        if let Some(size) = row.group_opt("filesize") {
            builder = builder.size_text(size);
        }
        if let Some(seeds) = row.group_opt("seeds") {
            builder = builder.seeds(parse_count(seeds));
        }

        if let Some(ms) = row
            .group_opt("timestamp")
            .and_then(|t| t.parse::<i64>().ok())
            .and_then(|secs| secs.checked_mul(1000))
        {
            builder = builder.creation_time(ms);
        } else if let Some(date) = row.group_opt("creationdate") {
            let date = decode_html_entities(date);
            builder = if self.config.relative_dates {
                match parse_relative_age(&date, Utc::now().timestamp_millis()) {
                    Some(ms) => builder.creation_time(ms),
                    None => builder,
                }
            } else {
                builder.creation_time_text(date)
            };
        }

        let magnet = row.group_opt("magneturl").map(decode_html_entities);
        let hash = row.group_opt("infohash");
        if magnet.is_some() || hash.is_some() {
            if let Some(magnet) = magnet {
                builder = builder.magnet_uri(magnet);
            }
            if let Some(hash) = hash {
                builder = builder.info_hash(hash);
            }
            return Ok(builder.require_hash().build()?);
        }

        if details_url.is_none() {
            return Err(RecordParseError::MissingField("magnet, hash or details URL"));
        }
        Ok(builder.preliminary().build()?)
    }
}

impl ParseStrategy for RegexListingSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn search_url(&self, encoded_keywords: &str, page: u32) -> String {
        self.url.render(encoded_keywords, page)
    }

    fn parse_results(&self, body: &str) -> Vec<SearchResult> {
        let Some(region) = self.results_region(body) else {
            debug!(source = %self.name, "Start marker not found, no result rows");
            return Vec::new();
        };

        let results = self.scan(&self.pattern, region);
        match &self.alt_pattern {
            Some(alt) if results.is_empty() => self.scan(alt, region),
            _ => results,
        }
    }

    fn max_results(&self) -> usize {
        self.max_results
    }

    fn has_next_page(&self, _page: u32, _body: &str, parsed: usize) -> bool {
        parsed > 0 && self.url.is_paged()
    }
}

fn compile_row_pattern(
    source: &str,
    field: &str,
    pattern: &str,
) -> Result<SearchPattern, StrategyConfigError> {
    let compiled =
        SearchPattern::compile(pattern).map_err(|e| StrategyConfigError::InvalidPattern {
            adapter: source.to_string(),
            field: field.to_string(),
            message: e.to_string(),
        })?;

    if !compiled.has_group("displayname") {
        return Err(StrategyConfigError::MissingGroup {
            adapter: source.to_string(),
            group: "displayname".to_string(),
        });
    }
    if !LOCATOR_GROUPS.iter().any(|g| compiled.has_group(g)) {
        return Err(StrategyConfigError::MissingGroup {
            adapter: source.to_string(),
            group: LOCATOR_GROUPS.join("|"),
        });
    }
    Ok(compiled)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Resolve a scraped link against a site prefix.
pub(super) fn join_url(prefix: Option<&str>, url: &str) -> String {
    let url = decode_html_entities(url.trim());
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("magnet:")
    {
        return url;
    }
    if let Some(rest) = url.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    match prefix {
        Some(prefix) => format!(
            "{}/{}",
            prefix.trim_end_matches('/'),
            url.trim_start_matches('/')
        ),
        None => url,
    }
}

/// Seed and peer counts as printed on listing pages ("1,204"); junk is 0.
pub(super) fn parse_count(text: &str) -> i64 {
    text.trim().replace([',', '.'], "").parse().unwrap_or(0)
}

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::fetch::DEFAULT_USER_AGENT;
use crate::performer::PerformerOptions;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub resolver: Option<ResolverConfig>,
}

/// Limits shared by every performer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchSettings {
    /// Per-request timeout for listing and detail pages (default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Results per performer run (default: 50)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Listing pages per performer run (default: 1)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Detail pages fetched per performer run (default: 10)
    #[serde(default = "default_crawl_budget")]
    pub crawl_budget: usize,
    /// Concurrent detail fetches (default: 4)
    #[serde(default = "default_crawl_fanout")]
    pub crawl_fanout: usize,
    /// Dispatcher worker-pool size (default: 6)
    #[serde(default = "default_max_parallel_performers")]
    pub max_parallel_performers: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_results: default_max_results(),
            max_pages: default_max_pages(),
            crawl_budget: default_crawl_budget(),
            crawl_fanout: default_crawl_fanout(),
            max_parallel_performers: default_max_parallel_performers(),
            user_agent: default_user_agent(),
        }
    }
}

impl SearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Performer options for a source, applying its overrides.
    pub fn performer_options(&self, source: &SourceConfig) -> PerformerOptions {
        PerformerOptions {
            timeout: self.timeout(),
            max_results: source.max_results.unwrap_or(self.max_results),
            max_pages: source.max_pages.unwrap_or(self.max_pages),
            crawl_budget: self.crawl_budget,
            user_agent: self.user_agent.clone(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_results() -> usize {
    50
}

fn default_max_pages() -> u32 {
    1
}

fn default_crawl_budget() -> usize {
    10
}

fn default_crawl_fanout() -> usize {
    4
}

fn default_max_parallel_performers() -> usize {
    6
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_true() -> bool {
    true
}

/// One configured source adapter.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Adapter name, used as every result's `source`
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Listing URL with `{keywords}` and optional `{page}` / `{page0}`
    pub search_url: String,
    /// Overrides `search.max_results`
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Overrides `search.max_pages`
    #[serde(default)]
    pub max_pages: Option<u32>,
    #[serde(flatten)]
    pub kind: SourceKind,
    /// Detail-page crawl; required for listings that yield preliminary rows
    #[serde(default)]
    pub crawl: Option<CrawlConfig>,
}

/// Available adapter shapes
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    JsonApi(JsonApiConfig),
    RegexListing(RegexListingConfig),
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::JsonApi(_) => "json_api",
            SourceKind::RegexListing(_) => "regex_listing",
        }
    }
}

/// JSON API adapter: field names are fallback lists, first present key wins.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct JsonApiConfig {
    #[serde(default = "default_array_fields")]
    pub array_fields: Vec<String>,
    #[serde(default = "default_name_fields")]
    pub name_fields: Vec<String>,
    #[serde(default = "default_hash_fields")]
    pub hash_fields: Vec<String>,
    #[serde(default = "default_magnet_fields")]
    pub magnet_fields: Vec<String>,
    #[serde(default = "default_size_fields")]
    pub size_fields: Vec<String>,
    #[serde(default = "default_seeds_fields")]
    pub seeds_fields: Vec<String>,
    #[serde(default = "default_created_fields")]
    pub created_fields: Vec<String>,
    #[serde(default = "default_details_fields")]
    pub details_fields: Vec<String>,
    #[serde(default = "default_thumbnail_fields")]
    pub thumbnail_fields: Vec<String>,
    #[serde(default = "default_torrent_url_fields")]
    pub torrent_url_fields: Vec<String>,
    /// Details URL built from the hash when the record carries none,
    /// e.g. `https://site/#/search?q={infohash}`
    #[serde(default)]
    pub details_url_template: Option<String>,
    /// Drop records without a valid info hash (default: true)
    #[serde(default = "default_true")]
    pub require_hash: bool,
}

impl Default for JsonApiConfig {
    fn default() -> Self {
        Self {
            array_fields: default_array_fields(),
            name_fields: default_name_fields(),
            hash_fields: default_hash_fields(),
            magnet_fields: default_magnet_fields(),
            size_fields: default_size_fields(),
            seeds_fields: default_seeds_fields(),
            created_fields: default_created_fields(),
            details_fields: default_details_fields(),
            thumbnail_fields: default_thumbnail_fields(),
            torrent_url_fields: default_torrent_url_fields(),
            details_url_template: None,
            require_hash: true,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn default_array_fields() -> Vec<String> {
    strings(&["torrents", "results", "data"])
}

fn default_name_fields() -> Vec<String> {
    strings(&["name", "title", "filename"])
}

fn default_hash_fields() -> Vec<String> {
    strings(&["infohash", "info_hash", "hash"])
}

fn default_magnet_fields() -> Vec<String> {
    strings(&["magnet", "magnet_uri", "magnetUri"])
}

fn default_size_fields() -> Vec<String> {
    strings(&["size_bytes", "size", "length", "bytes"])
}

fn default_seeds_fields() -> Vec<String> {
    strings(&["seeders", "seeds", "seed"])
}

fn default_created_fields() -> Vec<String> {
    strings(&["created_unix", "created", "createdAt", "date", "uploaded"])
}

fn default_details_fields() -> Vec<String> {
    strings(&["details_url", "url", "link"])
}

fn default_thumbnail_fields() -> Vec<String> {
    strings(&["thumbnail", "poster", "image"])
}

fn default_torrent_url_fields() -> Vec<String> {
    strings(&["torrent_url", "download"])
}

/// Regex listing adapter.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RegexListingConfig {
    /// Row pattern with named groups (`displayname`, `detailsurl`, ...)
    pub pattern: String,
    /// Tried when `pattern` matches nothing on a page
    #[serde(default)]
    pub alt_pattern: Option<String>,
    /// Page text before the first occurrence is ignored (e.g. `</thead>`)
    #[serde(default)]
    pub start_marker: Option<String>,
    /// Page text after the first occurrence is ignored
    #[serde(default)]
    pub end_marker: Option<String>,
    /// Prefix joined to relative details, torrent and thumbnail URLs
    #[serde(default)]
    pub details_prefix: Option<String>,
    /// Parse `creationdate` as "3 days ago" style text
    #[serde(default)]
    pub relative_dates: bool,
}

/// Detail-page crawl configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Detail pattern with named groups (`magnet`, `infohash`, `size`, ...)
    pub pattern: String,
    /// Overrides `search.crawl_fanout`
    #[serde(default)]
    pub fanout: Option<usize>,
}

/// External cloud-resolver process
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Executable to launch
    pub program: String,
    /// Arguments placed before the page URL (default: ["--meta-only"])
    #[serde(default = "default_resolver_args")]
    pub args: Vec<String>,
    /// Seconds to wait for each event line (default: 60)
    #[serde(default = "default_resolver_timeout")]
    pub timeout_secs: u64,
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_resolver_args() -> Vec<String> {
    strings(&["--meta-only"])
}

fn default_resolver_timeout() -> u64 {
    60
}

//! Types for the search result model.

use serde::{Deserialize, Serialize};

use crate::normalize::UNKNOWN_SIZE;

use super::SearchResultBuilder;

/// File facet: the item resolves to a named file of known or unknown size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFacet {
    pub filename: String,
    /// Size in bytes, `-1` when unknown.
    pub size: i64,
}

impl FileFacet {
    /// Whether the size was resolved.
    pub fn has_size(&self) -> bool {
        self.size != UNKNOWN_SIZE
    }
}

/// Torrent facet: the item can be handed to a BitTorrent session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentFacet {
    /// 40-char lowercase hex or 32-char uppercase base32.
    pub info_hash: String,
    pub magnet_uri: String,
    /// Direct `.torrent` download link, when the source offers one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_url: Option<String>,
    pub seeds: u32,
}

/// Http facet: the item can be downloaded over plain HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpFacet {
    pub download_url: String,
}

/// Streamable facet: the item can be played without a full download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFacet {
    pub stream_url: String,
}

/// One discovered item.
///
/// `complete == false` marks a preliminary result that still needs a crawl
/// strategy to fill in its facets before it can be acted upon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub(super) display_name: String,
    pub(super) source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) details_url: Option<String>,
    /// Epoch milliseconds.
    pub(super) creation_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) thumbnail_url: Option<String>,
    pub(super) complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) file: Option<FileFacet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) torrent: Option<TorrentFacet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) http: Option<HttpFacet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) stream: Option<StreamFacet>,
}

impl SearchResult {
    /// Start building a result.
    pub fn builder() -> SearchResultBuilder {
        SearchResultBuilder::new()
    }

    /// A builder pre-populated with this result's identity and facets.
    ///
    /// Crawl strategies use this to derive the complete value from a
    /// preliminary one while keeping `display_name`, `details_url`, `source`
    /// and `creation_time`.
    pub fn to_builder(&self) -> SearchResultBuilder {
        SearchResultBuilder::from_result(self)
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn details_url(&self) -> Option<&str> {
        self.details_url.as_deref()
    }

    pub fn creation_time(&self) -> i64 {
        self.creation_time
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail_url.as_deref()
    }

    /// `false` for preliminary, crawlable placeholders.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_preliminary(&self) -> bool {
        !self.complete
    }

    pub fn file(&self) -> Option<&FileFacet> {
        self.file.as_ref()
    }

    pub fn torrent(&self) -> Option<&TorrentFacet> {
        self.torrent.as_ref()
    }

    pub fn http(&self) -> Option<&HttpFacet> {
        self.http.as_ref()
    }

    pub fn stream(&self) -> Option<&StreamFacet> {
        self.stream.as_ref()
    }

    /// Size in bytes, `-1` when unknown or when there is no file facet.
    pub fn size(&self) -> i64 {
        self.file.as_ref().map(|f| f.size).unwrap_or(UNKNOWN_SIZE)
    }

    pub fn info_hash(&self) -> Option<&str> {
        self.torrent.as_ref().map(|t| t.info_hash.as_str())
    }

    pub fn seeds(&self) -> Option<u32> {
        self.torrent.as_ref().map(|t| t.seeds)
    }

    /// Key used to de-duplicate results within one source: the info hash when
    /// known, else the details URL, else the display name.
    pub fn dedup_key(&self) -> String {
        if let Some(hash) = self.info_hash() {
            return format!("hash:{}", hash);
        }
        if let Some(url) = self.details_url() {
            return format!("url:{}", url);
        }
        format!("name:{}", self.display_name)
    }
}

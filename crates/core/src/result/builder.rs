//! Fluent builder for `SearchResult`.
//!
//! Setters only record raw input. Validation, hash normalization and size-unit
//! conversion all happen in `build()`, so a half-configured builder is cheap
//! and always mutable. Empty strings are treated as absent.

use chrono::Utc;
use thiserror::Error;

use crate::normalize::{
    build_magnet_uri, info_hash_from_magnet, normalize_info_hash, parse_size, parse_torrent_date,
    UNKNOWN_SIZE,
};

use super::{FileFacet, HttpFacet, SearchResult, StreamFacet, TorrentFacet};

/// Reasons a builder refuses to produce a result.
///
/// Strategies treat every variant as "skip this record".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Result has no display name")]
    MissingDisplayName,

    #[error("Result has no source")]
    MissingSource,

    #[error("Invalid or missing info hash: {0:?}")]
    InvalidInfoHash(String),
}

/// Builder for [`SearchResult`].
#[derive(Debug, Clone, Default)]
pub struct SearchResultBuilder {
    display_name: Option<String>,
    source: Option<String>,
    details_url: Option<String>,
    thumbnail_url: Option<String>,
    creation_time: Option<i64>,
    creation_time_text: Option<String>,
    preliminary: bool,

    filename: Option<String>,
    size: Option<i64>,
    size_text: Option<String>,

    magnet_uri: Option<String>,
    info_hash: Option<String>,
    torrent_url: Option<String>,
    seeds: Option<i64>,
    require_hash: bool,

    download_url: Option<String>,
    stream_url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SearchResultBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn from_result(result: &SearchResult) -> Self {
        let mut builder = Self {
            display_name: Some(result.display_name.clone()),
            source: Some(result.source.clone()),
            details_url: result.details_url.clone(),
            thumbnail_url: result.thumbnail_url.clone(),
            creation_time: Some(result.creation_time),
            preliminary: !result.complete,
            ..Self::default()
        };
        if let Some(file) = &result.file {
            builder.filename = Some(file.filename.clone());
            builder.size = Some(file.size);
        }
        if let Some(torrent) = &result.torrent {
            builder.info_hash = Some(torrent.info_hash.clone());
            builder.magnet_uri = Some(torrent.magnet_uri.clone());
            builder.torrent_url = torrent.torrent_url.clone();
            builder.seeds = Some(torrent.seeds as i64);
        }
        builder.download_url = result.http.as_ref().map(|h| h.download_url.clone());
        builder.stream_url = result.stream.as_ref().map(|s| s.stream_url.clone());
        builder
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Adapter identifier; must match the name the dispatcher routes by.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn details_url(mut self, url: impl Into<String>) -> Self {
        self.details_url = Some(url.into());
        self
    }

    pub fn thumbnail_url(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// Creation time in epoch milliseconds.
    pub fn creation_time(mut self, millis: i64) -> Self {
        self.creation_time = Some(millis);
        self
    }

    /// Creation time as scraped text; parsed at build time, falling back to now.
    pub fn creation_time_text(mut self, text: impl Into<String>) -> Self {
        self.creation_time_text = Some(text.into());
        self
    }

    /// Mark the result as a preliminary placeholder awaiting a crawl.
    pub fn preliminary(mut self) -> Self {
        self.preliminary = true;
        self
    }

    /// Mark the result as complete (the default).
    pub fn complete(mut self) -> Self {
        self.preliminary = false;
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Size in bytes; negative means unknown.
    pub fn size(mut self, bytes: i64) -> Self {
        self.size = Some(bytes);
        self.size_text = None;
        self
    }

    /// Size as scraped text ("700.0 MiB"); converted at build time.
    pub fn size_text(mut self, text: impl Into<String>) -> Self {
        self.size_text = Some(text.into());
        self.size = None;
        self
    }

    pub fn magnet_uri(mut self, magnet: impl Into<String>) -> Self {
        self.magnet_uri = Some(magnet.into());
        self
    }

    pub fn info_hash(mut self, hash: impl Into<String>) -> Self {
        self.info_hash = Some(hash.into());
        self
    }

    pub fn torrent_url(mut self, url: impl Into<String>) -> Self {
        self.torrent_url = Some(url.into());
        self
    }

    /// Seed count; negative values clamp to zero.
    pub fn seeds(mut self, seeds: i64) -> Self {
        self.seeds = Some(seeds);
        self
    }

    /// Fail the build instead of silently omitting the torrent facet when no
    /// valid info hash can be resolved.
    pub fn require_hash(mut self) -> Self {
        self.require_hash = true;
        self
    }

    pub fn download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    /// Validate and produce an immutable result.
    pub fn build(self) -> Result<SearchResult, ValidationError> {
        let display_name =
            non_empty(self.display_name).ok_or(ValidationError::MissingDisplayName)?;
        let source = non_empty(self.source).ok_or(ValidationError::MissingSource)?;

        let creation_time = self
            .creation_time
            .filter(|t| *t >= 0)
            .or_else(|| {
                self.creation_time_text
                    .as_deref()
                    .and_then(parse_torrent_date)
            })
            .unwrap_or_else(|| Utc::now().timestamp_millis());

        let torrent = Self::resolve_torrent(
            &display_name,
            non_empty(self.info_hash),
            non_empty(self.magnet_uri),
            non_empty(self.torrent_url),
            self.seeds,
            self.require_hash,
        )?;

        let size = match (self.size, non_empty(self.size_text)) {
            (Some(bytes), _) => Some(if bytes < 0 { UNKNOWN_SIZE } else { bytes }),
            (None, Some(text)) => Some(parse_size(&text)),
            (None, None) => None,
        };
        let filename = non_empty(self.filename);

        let file = if filename.is_some() || size.is_some() || torrent.is_some() {
            let filename = filename.unwrap_or_else(|| {
                if torrent.is_some() {
                    format!("{}.torrent", display_name)
                } else {
                    display_name.clone()
                }
            });
            Some(FileFacet {
                filename,
                size: size.unwrap_or(UNKNOWN_SIZE),
            })
        } else {
            None
        };

        Ok(SearchResult {
            display_name,
            source,
            details_url: non_empty(self.details_url),
            creation_time,
            thumbnail_url: non_empty(self.thumbnail_url),
            complete: !self.preliminary,
            file,
            torrent,
            http: non_empty(self.download_url).map(|download_url| HttpFacet { download_url }),
            stream: non_empty(self.stream_url).map(|stream_url| StreamFacet { stream_url }),
        })
    }

    fn resolve_torrent(
        display_name: &str,
        info_hash: Option<String>,
        magnet_uri: Option<String>,
        torrent_url: Option<String>,
        seeds: Option<i64>,
        require_hash: bool,
    ) -> Result<Option<TorrentFacet>, ValidationError> {
        let magnet_uri = magnet_uri.filter(|m| m.to_ascii_lowercase().starts_with("magnet:"));

        let hash = info_hash
            .as_deref()
            .and_then(normalize_info_hash)
            .or_else(|| magnet_uri.as_deref().and_then(info_hash_from_magnet));

        match hash {
            Some(info_hash) => {
                let magnet_uri =
                    magnet_uri.unwrap_or_else(|| build_magnet_uri(&info_hash, display_name));
                Ok(Some(TorrentFacet {
                    info_hash,
                    magnet_uri,
                    torrent_url,
                    seeds: seeds.unwrap_or(0).clamp(0, u32::MAX as i64) as u32,
                }))
            }
            None if require_hash => Err(ValidationError::InvalidInfoHash(
                info_hash.or(magnet_uri).unwrap_or_default(),
            )),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "c9e15763f722f23e98a29decdfae341b98d53056";

    fn base() -> SearchResultBuilder {
        SearchResult::builder()
            .display_name("Ubuntu 24.04 Desktop")
            .source("test")
            .creation_time(1_700_000_000_000)
    }

    #[test]
    fn test_missing_display_name() {
        let err = SearchResult::builder().source("test").build().unwrap_err();
        assert_eq!(err, ValidationError::MissingDisplayName);

        let err = SearchResult::builder()
            .display_name("   ")
            .source("test")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingDisplayName);
    }

    #[test]
    fn test_missing_source() {
        let err = SearchResult::builder()
            .display_name("x")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingSource);
    }

    #[test]
    fn test_hash_extracted_from_magnet() {
        let result = base()
            .magnet_uri(format!("magnet:?xt=urn:btih:{}&dn=ubuntu", HASH.to_uppercase()))
            .seeds(42)
            .build()
            .unwrap();

        let torrent = result.torrent().unwrap();
        assert_eq!(torrent.info_hash, HASH);
        assert_eq!(torrent.seeds, 42);
        assert!(torrent.magnet_uri.contains("dn=ubuntu"));
        assert!(result.is_complete());
    }

    #[test]
    fn test_magnet_generated_from_hash() {
        let result = base().info_hash(HASH).build().unwrap();
        let torrent = result.torrent().unwrap();
        assert!(torrent
            .magnet_uri
            .starts_with(&format!("magnet:?xt=urn:btih:{}", HASH)));
    }

    #[test]
    fn test_invalid_hash_omits_torrent_facet() {
        let result = base().info_hash("not-a-hash").build().unwrap();
        assert!(result.torrent().is_none());
    }

    #[test]
    fn test_invalid_hash_rejected_when_required() {
        let err = base().info_hash("not-a-hash").require_hash().build().unwrap_err();
        assert_eq!(err, ValidationError::InvalidInfoHash("not-a-hash".to_string()));

        let err = base().require_hash().build().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidInfoHash(_)));
    }

    #[test]
    fn test_size_text_converted_at_build() {
        let result = base().size_text("700.0 MiB").build().unwrap();
        assert_eq!(result.size(), 734_003_200);
    }

    #[test]
    fn test_unparseable_size_is_unknown_but_kept() {
        let result = base().info_hash(HASH).size_text("N/A").build().unwrap();
        assert_eq!(result.size(), -1);
        assert!(result.torrent().is_some());
    }

    #[test]
    fn test_torrent_filename_default() {
        let result = base().info_hash(HASH).build().unwrap();
        assert_eq!(
            result.file().unwrap().filename,
            "Ubuntu 24.04 Desktop.torrent"
        );
    }

    #[test]
    fn test_creation_time_text_and_fallback() {
        let parsed = SearchResult::builder()
            .display_name("x")
            .source("test")
            .creation_time_text("2024-01-31")
            .build()
            .unwrap();
        assert_eq!(parsed.creation_time(), 1_706_659_200_000);

        let before = Utc::now().timestamp_millis();
        let fallback = SearchResult::builder()
            .display_name("x")
            .source("test")
            .creation_time_text("not a date")
            .build()
            .unwrap();
        assert!(fallback.creation_time() >= before);
    }

    #[test]
    fn test_negative_seeds_clamped() {
        let result = base().info_hash(HASH).seeds(-5).build().unwrap();
        assert_eq!(result.seeds(), Some(0));
    }

    #[test]
    fn test_to_builder_preserves_identity() {
        let preliminary = SearchResult::builder()
            .display_name("Some Show S01")
            .source("1337x")
            .details_url("https://1337x.to/torrent/1/some-show/")
            .creation_time(123)
            .preliminary()
            .build()
            .unwrap();
        assert!(preliminary.is_preliminary());

        let complete = preliminary
            .to_builder()
            .info_hash(HASH)
            .size_text("1.5 GiB")
            .seeds(7)
            .complete()
            .build()
            .unwrap();

        assert!(complete.is_complete());
        assert_eq!(complete.display_name(), preliminary.display_name());
        assert_eq!(complete.details_url(), preliminary.details_url());
        assert_eq!(complete.source(), preliminary.source());
        assert_eq!(complete.creation_time(), 123);
        assert_eq!(complete.size(), 1_610_612_736);
    }

    #[test]
    fn test_http_and_stream_facets() {
        let result = base()
            .download_url("https://cdn.example.com/a.mp4")
            .stream_url("https://cdn.example.com/a.m4a")
            .build()
            .unwrap();
        assert_eq!(
            result.http().unwrap().download_url,
            "https://cdn.example.com/a.mp4"
        );
        assert_eq!(
            result.stream().unwrap().stream_url,
            "https://cdn.example.com/a.m4a"
        );
        assert!(result.file().is_none());
    }
}

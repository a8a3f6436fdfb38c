//! Resolver metadata to search results.

use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::normalize::parse_compact_date;
use crate::result::SearchResult;

use super::ResolverError;

/// Source name prefix; the extractor name follows (`Cloud:youtube`).
pub const CLOUD_SOURCE_PREFIX: &str = "Cloud:";

/// Horizontal videos narrower than this are skipped when alternatives exist.
const MIN_HORIZONTAL_WIDTH: u32 = 320;
/// Vertical videos shorter than this are skipped when alternatives exist.
const MIN_VERTICAL_HEIGHT: u32 = 480;
/// Codec-less formats get a height label only above this.
const MIN_LABELLED_HEIGHT: u32 = 240;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResolverMeta {
    title: String,
    extractor: String,
    webpage_url: String,
    upload_date: Option<String>,
    thumbnail: Option<String>,
    formats: Option<Vec<MediaFormat>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaFormat {
    url: String,
    ext: String,
    acodec: Option<String>,
    vcodec: Option<String>,
    filesize: Option<i64>,
    width: Option<u32>,
    height: Option<u32>,
}

fn has_codec(codec: &Option<String>) -> bool {
    matches!(codec.as_deref(), Some(c) if !c.is_empty() && c != "none")
}

/// Rewrite page URLs the resolver handles better in another form.
pub fn normalize_page_url(url: &str) -> String {
    if url.contains("instagram.com/reel/") {
        url.replace("/reel/", "/p/")
    } else {
        url.to_string()
    }
}

/// Convert a resolver metadata object into one result per usable format.
///
/// Playlists (`.m3u8`) are skipped, as are low-resolution variants when the
/// page offers more than one format. Every result is complete and carries both
/// an http and a streamable facet pointing at the format URL.
pub fn meta_to_results(json: &str) -> Result<Vec<SearchResult>, ResolverError> {
    let meta: ResolverMeta =
        serde_json::from_str(json).map_err(|e| ResolverError::InvalidMeta(e.to_string()))?;

    let Some(formats) = meta.formats.as_ref() else {
        debug!(url = %meta.webpage_url, "Resolver metadata has no formats");
        return Ok(Vec::new());
    };

    let source = format!("{}{}", CLOUD_SOURCE_PREFIX, meta.extractor);
    let creation_time = meta
        .upload_date
        .as_deref()
        .and_then(parse_compact_date)
        .unwrap_or_else(|| Utc::now().timestamp_millis());
    let is_youtube = meta.webpage_url.contains("youtu");
    let several = formats.len() > 1;

    let mut results = Vec::new();
    for format in formats {
        if format.url.is_empty() || format.url.contains(".m3u8") {
            continue;
        }

        let width = format.width.unwrap_or(0);
        let height = format.height.unwrap_or(0);
        if several && height != 0 && width > height && width < MIN_HORIZONTAL_WIDTH {
            continue;
        }
        if several && height > width && height < MIN_VERTICAL_HEIGHT {
            continue;
        }

        let audio = has_codec(&format.acodec);
        let video = has_codec(&format.vcodec);
        if is_youtube && !audio {
            continue;
        }

        let label = if audio && !video {
            "(audio)".to_string()
        } else if video && width != 0 && height != 0 {
            format!("({}x{})", width, height)
        } else if video && height != 0 {
            format!("({}p)", height)
        } else if !video && !audio && height > MIN_LABELLED_HEIGHT {
            format!("({}p)", height)
        } else {
            String::new()
        };

        let display_name = format!("{} {}", label, meta.title).trim().to_string();
        let filename = if label.is_empty() {
            format!("{}.{}", meta.title, format.ext)
        } else {
            format!("{} {}.{}", meta.title, label, format.ext)
        };

        let mut builder = SearchResult::builder()
            .display_name(display_name)
            .source(&source)
            .details_url(&meta.webpage_url)
            .creation_time(creation_time)
            .filename(filename)
            .size(format.filesize.filter(|s| *s > 0).unwrap_or(-1))
            .download_url(&format.url)
            .stream_url(&format.url);
        if let Some(thumbnail) = &meta.thumbnail {
            builder = builder.thumbnail_url(thumbnail);
        }

        match builder.build() {
            Ok(result) => results.push(result),
            Err(e) => debug!(source = %source, error = %e, "Skipping resolver format"),
        }
    }
    Ok(results)
}

//! JSON API listing adapter.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::JsonApiConfig;
use crate::metrics::RECORDS_SKIPPED;
use crate::normalize::normalize_info_hash;
use crate::result::SearchResult;

use super::{ParseStrategy, RecordParseError, StrategyConfigError, UrlTemplate};

const INFOHASH_PLACEHOLDER: &str = "{infohash}";

/// Seconds below this are unix seconds, above it milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Parse strategy for sources answering with JSON.
///
/// The body is either a root array or an object holding the array under one
/// of `array_fields`. Every record field is read through a fallback key list
/// and may be a string or a number.
pub struct JsonApiSource {
    name: String,
    url: UrlTemplate,
    config: JsonApiConfig,
    max_results: usize,
}

impl JsonApiSource {
    pub fn new(
        name: impl Into<String>,
        search_url: &str,
        config: JsonApiConfig,
        max_results: usize,
    ) -> Result<Self, StrategyConfigError> {
        let name = name.into();
        let url = UrlTemplate::parse(&name, search_url)?;

        if config.name_fields.is_empty() {
            return Err(StrategyConfigError::Invalid {
                adapter: name,
                message: "name_fields cannot be empty".to_string(),
            });
        }
        if let Some(template) = &config.details_url_template {
            if !template.contains(INFOHASH_PLACEHOLDER) {
                return Err(StrategyConfigError::InvalidUrlTemplate {
                    adapter: name,
                    message: format!("details_url_template missing {}", INFOHASH_PLACEHOLDER),
                });
            }
        }

        Ok(Self {
            name,
            url,
            config,
            max_results,
        })
    }

    fn records<'a>(&self, root: &'a Value) -> &'a [Value] {
        match root {
            Value::Array(items) => items,
            Value::Object(map) => self
                .config
                .array_fields
                .iter()
                .find_map(|field| map.get(field).and_then(Value::as_array))
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            _ => &[],
        }
    }

    fn parse_record(&self, record: &Value) -> Result<SearchResult, RecordParseError> {
        let record = record.as_object().ok_or(RecordParseError::NotAnObject)?;
        let cfg = &self.config;

        let name = first(record, &cfg.name_fields)
            .and_then(as_text)
            .ok_or(RecordParseError::MissingField("name"))?;

        let mut builder = SearchResult::builder()
            .display_name(name)
            .source(&self.name);

        let raw_hash = first(record, &cfg.hash_fields).and_then(as_text);
        if let Some(hash) = &raw_hash {
            builder = builder.info_hash(hash.as_str());
        }
        if let Some(magnet) = first(record, &cfg.magnet_fields).and_then(as_text) {
            builder = builder.magnet_uri(magnet);
        }
        if cfg.require_hash {
            builder = builder.require_hash();
        }

        if let Some(size) = first(record, &cfg.size_fields) {
            builder = match as_i64(size) {
                Some(bytes) => builder.size(bytes),
                None => builder.size_text(as_text(size).unwrap_or_default()),
            };
        }
        if let Some(seeds) = first(record, &cfg.seeds_fields).and_then(as_i64) {
            builder = builder.seeds(seeds);
        }
        if let Some(created) = first(record, &cfg.created_fields) {
            // Out-of-range timestamps leave the builder's "now" fallback in place.
            builder = match as_i64(created) {
                Some(t) if t < MILLIS_THRESHOLD => match t.checked_mul(1000) {
                    Some(ms) => builder.creation_time(ms),
                    None => builder,
                },
                Some(t) => builder.creation_time(t),
                None => builder.creation_time_text(as_text(created).unwrap_or_default()),
            };
        }

        let details = first(record, &cfg.details_fields)
            .and_then(as_text)
            .or_else(|| {
                let template = cfg.details_url_template.as_ref()?;
                let hash = raw_hash.as_deref().and_then(normalize_info_hash)?;
                Some(template.replace(INFOHASH_PLACEHOLDER, &hash))
            });
        if let Some(details) = details {
            builder = builder.details_url(details);
        }
        if let Some(thumbnail) = first(record, &cfg.thumbnail_fields).and_then(as_text) {
            builder = builder.thumbnail_url(thumbnail);
        }
        if let Some(torrent_url) = first(record, &cfg.torrent_url_fields).and_then(as_text) {
            builder = builder.torrent_url(torrent_url);
        }

        Ok(builder.build()?)
    }
}

impl ParseStrategy for JsonApiSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn search_url(&self, encoded_keywords: &str, page: u32) -> String {
        self.url.render(encoded_keywords, page)
    }

    fn parse_results(&self, body: &str) -> Vec<SearchResult> {
        if body.trim().is_empty() {
            return Vec::new();
        }
        let root: Value = match serde_json::from_str(body) {
            Ok(root) => root,
            Err(e) => {
                debug!(source = %self.name, error = %e, "Response is not JSON");
                return Vec::new();
            }
        };

        let mut results = Vec::new();
        for record in self.records(&root) {
            if results.len() >= self.max_results {
                break;
            }
            match self.parse_record(record) {
                Ok(result) => results.push(result),
                Err(e) => {
                    RECORDS_SKIPPED.with_label_values(&[self.name.as_str()]).inc();
                    debug!(source = %self.name, reason = %e, "Skipping record");
                }
            }
        }
        results
    }

    fn max_results(&self) -> usize {
        self.max_results
    }

    fn has_next_page(&self, _page: u32, _body: &str, parsed: usize) -> bool {
        parsed > 0 && self.url.is_paged()
    }
}

fn first<'a>(record: &'a Map<String, Value>, keys: &[String]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| record.get(key).filter(|value| !value.is_null()))
}

fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

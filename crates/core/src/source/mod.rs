//! Source adapter contracts and the configurable adapters built on them.
//!
//! A source adapter is a [`ParseStrategy`] plus an optional [`CrawlStrategy`].
//! The adapters here are driven by configuration so new sites can be added
//! without new code; patterns are compiled when the adapter is constructed.

mod crawl_cache;
mod crawler;
mod json_api;
mod regex_detail;
mod regex_listing;
mod traits;
mod url_template;

pub use crawl_cache::{CrawlCache, MemoryCrawlCache, FAILED_URL_LIFETIME};
pub use crawler::DetailPageCrawler;
pub use json_api::JsonApiSource;
pub use regex_detail::RegexDetailParser;
pub use regex_listing::RegexListingSource;
pub use traits::*;
pub use url_template::UrlTemplate;

//! Source registry: turns configuration into adapters and adapters into
//! performers for a query.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{Config, SearchSettings, SourceConfig, SourceKind};
use crate::fetch::HttpFetch;
use crate::performer::{Performer, PerformerOptions, QueryToken, ResultListener, SearchPerformer};
use crate::resolver::{CloudResolverPerformer, EventSource, ProcessEventSource};
use crate::source::{
    CrawlCache, CrawlStrategy, DetailPageCrawler, JsonApiSource, MemoryCrawlCache, ParseStrategy,
    RegexDetailParser, RegexListingSource, StrategyConfigError,
};

/// One ready-to-use source adapter.
#[derive(Clone)]
pub struct RegisteredSource {
    pub parse: Arc<dyn ParseStrategy>,
    pub crawl: Option<Arc<dyn CrawlStrategy>>,
    pub options: PerformerOptions,
}

impl RegisteredSource {
    pub fn name(&self) -> &str {
        self.parse.name()
    }
}

struct ResolverSettings {
    events: Arc<dyn EventSource>,
    timeout: Duration,
}

/// Every usable source adapter plus the optional cloud resolver.
pub struct SourceRegistry {
    fetcher: Arc<dyn HttpFetch>,
    sources: Vec<RegisteredSource>,
    resolver: Option<ResolverSettings>,
}

impl SourceRegistry {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetcher,
            sources: Vec::new(),
            resolver: None,
        }
    }

    /// Build every enabled source in `config`.
    ///
    /// A source whose configuration is unusable is left out and its error
    /// returned, so the caller can report it while the others keep working.
    /// Crawling sources share one detail-page cache.
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn HttpFetch>,
    ) -> (Self, Vec<StrategyConfigError>) {
        let mut registry = Self::new(fetcher);
        let mut errors = Vec::new();
        let cache: Arc<dyn CrawlCache> = Arc::new(MemoryCrawlCache::new());

        for source in &config.sources {
            if !source.enabled {
                debug!(source = %source.name, "Source disabled");
                continue;
            }
            match build_source(source, &config.search, registry.fetcher.clone(), cache.clone()) {
                Ok(registered) => registry.register(registered),
                Err(e) => {
                    warn!(source = %source.name, error = %e, "Source disabled by configuration error");
                    errors.push(e);
                }
            }
        }

        if let Some(resolver) = &config.resolver {
            registry.set_resolver(
                Arc::new(ProcessEventSource::new(&resolver.program, resolver.args.clone())),
                resolver.timeout(),
            );
        }

        info!(
            sources = registry.sources.len(),
            resolver = registry.resolver.is_some(),
            "Source registry ready"
        );
        (registry, errors)
    }

    pub fn register(&mut self, source: RegisteredSource) {
        self.sources.push(source);
    }

    pub fn set_resolver(&mut self, events: Arc<dyn EventSource>, timeout: Duration) {
        self.resolver = Some(ResolverSettings { events, timeout });
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn has_resolver(&self) -> bool {
        self.resolver.is_some()
    }

    /// One fresh performer per source for a keyword query.
    pub fn performers(
        &self,
        token: QueryToken,
        keywords: &str,
        listener: Arc<dyn ResultListener>,
    ) -> Vec<Arc<dyn SearchPerformer>> {
        self.sources
            .iter()
            .map(|source| {
                Arc::new(Performer::new(
                    token,
                    keywords,
                    source.parse.clone(),
                    source.crawl.clone(),
                    self.fetcher.clone(),
                    listener.clone(),
                    source.options.clone(),
                )) as Arc<dyn SearchPerformer>
            })
            .collect()
    }

    /// A cloud-resolver performer for a media page URL, when configured.
    pub fn resolver_performer(
        &self,
        token: QueryToken,
        url: &str,
        listener: Arc<dyn ResultListener>,
    ) -> Option<Arc<dyn SearchPerformer>> {
        let resolver = self.resolver.as_ref()?;
        Some(Arc::new(CloudResolverPerformer::new(
            token,
            url,
            resolver.events.clone(),
            listener,
            resolver.timeout,
        )))
    }
}

/// Build one adapter from its configuration.
pub fn build_source(
    source: &SourceConfig,
    search: &SearchSettings,
    fetcher: Arc<dyn HttpFetch>,
    cache: Arc<dyn CrawlCache>,
) -> Result<RegisteredSource, StrategyConfigError> {
    let options = search.performer_options(source);
    let max_results = options.max_results;

    let (parse, needs_crawl, url_prefix): (Arc<dyn ParseStrategy>, bool, Option<String>) =
        match &source.kind {
            SourceKind::JsonApi(json) => (
                Arc::new(JsonApiSource::new(
                    &source.name,
                    &source.search_url,
                    json.clone(),
                    max_results,
                )?),
                false,
                None,
            ),
            SourceKind::RegexListing(listing) => {
                let adapter = RegexListingSource::new(
                    &source.name,
                    &source.search_url,
                    listing.clone(),
                    max_results,
                )?;
                let needs_crawl = adapter.needs_crawl();
                (Arc::new(adapter), needs_crawl, listing.details_prefix.clone())
            }
        };

    let crawl: Option<Arc<dyn CrawlStrategy>> = match &source.crawl {
        Some(crawl) => {
            let parser = RegexDetailParser::new(&source.name, &crawl.pattern, url_prefix)?;
            Some(Arc::new(DetailPageCrawler::new(
                &source.name,
                fetcher,
                parser,
                search.timeout(),
                &search.user_agent,
                crawl.fanout.unwrap_or(search.crawl_fanout),
            )
            .with_cache(cache)))
        }
        None if needs_crawl => {
            return Err(StrategyConfigError::Invalid {
                adapter: source.name.clone(),
                message: "listing rows carry no magnet or hash and no crawl is configured"
                    .to_string(),
            });
        }
        None => None,
    };

    debug!(
        source = %source.name,
        kind = source.kind.label(),
        crawl = crawl.is_some(),
        "Source built"
    );
    Ok(RegisteredSource {
        parse,
        crawl,
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use crate::testing::{MockFetcher, RecordingListener};

    const CONFIG: &str = r#"
[search]
crawl_budget = 5

[[sources]]
name = "api"
kind = "json_api"
search_url = "https://api.example/?q={keywords}"

[[sources]]
name = "listing"
kind = "regex_listing"
search_url = "https://listing.example/search/{keywords}/{page}/"
pattern = '<a href="(?<detailsurl>[^"]+)">(?<displayname>[^<]+)</a>'
details_prefix = "https://listing.example"

[sources.crawl]
pattern = 'href="(?<magnet>magnet:[^"]+)"'

[[sources]]
name = "broken"
kind = "regex_listing"
search_url = "https://broken.example/{keywords}"
pattern = '(?<displayname>[unclosed'

[[sources]]
name = "off"
enabled = false
kind = "json_api"
search_url = "https://off.example/?q={keywords}"

[[sources]]
name = "uncrawled"
kind = "regex_listing"
search_url = "https://uncrawled.example/{keywords}"
pattern = '<a href="(?<detailsurl>[^"]+)">(?<displayname>[^<]+)</a>'
"#;

    #[test]
    fn test_from_config_reports_bad_sources() {
        let config = load_config_from_str(CONFIG).unwrap();
        let (registry, errors) = SourceRegistry::from_config(&config, Arc::new(MockFetcher::new()));

        assert_eq!(registry.names(), vec!["api", "listing"]);
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            errors[0],
            StrategyConfigError::InvalidPattern { ref adapter, .. } if adapter == "broken"
        ));
        assert!(matches!(
            errors[1],
            StrategyConfigError::Invalid { ref adapter, .. } if adapter == "uncrawled"
        ));
        assert!(!registry.has_resolver());
    }

    #[test]
    fn test_performers_one_per_source() {
        let config = load_config_from_str(CONFIG).unwrap();
        let (registry, _) = SourceRegistry::from_config(&config, Arc::new(MockFetcher::new()));
        let token = QueryToken::new();

        let performers =
            registry.performers(token, "sintel", Arc::new(RecordingListener::new()));
        let sources: Vec<&str> = performers.iter().map(|p| p.source()).collect();
        assert_eq!(sources, vec!["api", "listing"]);
        assert!(performers.iter().all(|p| p.token() == token));
    }

    #[test]
    fn test_resolver_performer_requires_config() {
        let registry = SourceRegistry::new(Arc::new(MockFetcher::new()));
        assert!(registry
            .resolver_performer(
                QueryToken::new(),
                "https://vimeo.example/1",
                Arc::new(RecordingListener::new())
            )
            .is_none());

        let config = load_config_from_str(
            r#"
[resolver]
program = "telluride"
"#,
        )
        .unwrap();
        let (registry, errors) = SourceRegistry::from_config(&config, Arc::new(MockFetcher::new()));
        assert!(errors.is_empty());
        assert!(registry.is_empty());
        let performer = registry
            .resolver_performer(
                QueryToken::new(),
                "https://vimeo.example/1",
                Arc::new(RecordingListener::new()),
            )
            .unwrap();
        assert_eq!(performer.source(), "Cloud");
    }
}

//! End-to-end search flow tests.
//!
//! These drive real parse and crawl strategies through performers and the
//! dispatcher, with `MockFetcher` standing in for the network.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use dragnet_core::{
    config::{JsonApiConfig, RegexListingConfig},
    load_config_from_str,
    performer::StopFlag,
    source::{
        CrawlStrategy, DetailPageCrawler, JsonApiSource, ParseStrategy, RegexDetailParser,
        RegexListingSource,
    },
    testing::{fixtures, MockFetcher, RecordingListener, ScriptedEventSource},
    PerformOutcome, Performer, PerformerOptions, QueryToken, ResolverEvent, ResultListener,
    SearchManager, SearchPerformer, SearchResult, SearchSignal, SourceRegistry, StopReason,
};

const LISTING_URL: &str = "https://listing.example/search?q={keywords}";
const LISTING_PREFIX: &str = "https://listing.example";

fn listing_source() -> Arc<RegexListingSource> {
    let config = RegexListingConfig {
        pattern: fixtures::HTML_ROW_PATTERN.to_string(),
        details_prefix: Some(LISTING_PREFIX.to_string()),
        ..Default::default()
    };
    Arc::new(RegexListingSource::new("listing", LISTING_URL, config, 50).unwrap())
}

fn crawler(fetcher: Arc<MockFetcher>, fanout: usize) -> Arc<dyn CrawlStrategy> {
    let parser =
        RegexDetailParser::new("listing", fixtures::DETAIL_PATTERN, Some(LISTING_PREFIX.into()))
            .unwrap();
    Arc::new(DetailPageCrawler::new(
        "listing",
        fetcher,
        parser,
        Duration::from_secs(5),
        "dragnet-test",
        fanout,
    ))
}

async fn serve_details(fetcher: &MockFetcher, ids: &[usize]) {
    for id in ids {
        fetcher
            .respond(
                &format!("{}/torrent/{}/", LISTING_PREFIX, id),
                fixtures::detail_page(*id),
            )
            .await;
    }
}

fn options(max_pages: u32, crawl_budget: usize) -> PerformerOptions {
    PerformerOptions {
        max_pages,
        crawl_budget,
        ..Default::default()
    }
}

/// Stops its performer as soon as the first batch arrives.
#[derive(Default)]
struct StopAfterFirstBatch {
    inner: RecordingListener,
    stop: OnceLock<StopFlag>,
}

impl ResultListener for StopAfterFirstBatch {
    fn on_results(&self, token: QueryToken, source: &str, batch: Vec<SearchResult>) {
        self.inner.on_results(token, source, batch);
        if let Some(stop) = self.stop.get() {
            stop.stop();
        }
    }
}

#[test]
fn test_listing_rows_with_magnets_are_complete() {
    let html = format!(
        r#"<table>
<tr><td><a href="/t/1">Sintel 1080p</a></td><td><a href="magnet:?xt=urn:btih:{}&amp;dn=Sintel">m</a></td></tr>
<tr><td><a href="/t/2">Tears of Steel</a></td><td><a href="magnet:?xt=urn:btih:{}&amp;dn=Tears">m</a></td></tr>
</table>"#,
        fixtures::info_hash(1),
        fixtures::info_hash(2)
    );
    let config = RegexListingConfig {
        pattern: r#"<a href="(?<detailsurl>[^"]+)">(?<displayname>[^<]+)</a></td><td><a href="(?<magneturl>magnet:[^"]+)">"#.to_string(),
        details_prefix: Some(LISTING_PREFIX.to_string()),
        ..Default::default()
    };
    let source = RegexListingSource::new("magnets", LISTING_URL, config, 50).unwrap();

    let results = source.parse_results(&html);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_complete()));
    assert!(results.iter().all(|r| r.file().is_some() && r.torrent().is_some()));
    assert_eq!(results[0].info_hash(), Some(fixtures::info_hash(1).as_str()));
    assert_eq!(results[1].info_hash(), Some(fixtures::info_hash(2).as_str()));
    assert_eq!(results[1].details_url(), Some("https://listing.example/t/2"));
}

#[tokio::test]
async fn test_preliminary_row_completed_by_crawl() {
    let source = listing_source();
    let preliminary = source.parse_results(&fixtures::html_listing(&[7]));
    assert_eq!(preliminary.len(), 1);
    assert!(preliminary[0].is_preliminary());

    let fetcher = Arc::new(MockFetcher::new());
    serve_details(&fetcher, &[7]).await;

    let crawled = crawler(fetcher.clone(), 2)
        .crawl(preliminary, 10, &StopFlag::new())
        .await;
    assert_eq!(crawled.len(), 1);
    let result = &crawled[0];
    assert!(result.is_complete());
    assert_eq!(result.display_name(), "Item 7");
    assert_eq!(result.seeds(), Some(17));
    assert!((result.size() - 8_053_063_680).abs() <= 1);
    assert_eq!(result.info_hash(), Some(fixtures::info_hash(7).as_str()));
}

#[test]
fn test_json_results_key_fallback() {
    let body = format!(
        r#"{{"results":[{{"title":"Cosmos Laundromat","info_hash":"{}","size":"1.5 GiB","seeds":"4"}}]}}"#,
        fixtures::info_hash(3)
    );
    let source = JsonApiSource::new(
        "api",
        "https://api.example/?q={keywords}",
        JsonApiConfig::default(),
        50,
    )
    .unwrap();

    let results = source.parse_results(&body);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].display_name(), "Cosmos Laundromat");
    assert_eq!(results[0].seeds(), Some(4));
    assert_eq!(results[0].size(), 1_610_612_736);
}

#[test]
fn test_unparseable_size_kept_as_unknown() {
    let body = format!(
        r#"{{"torrents":[{{"name":"Spring","infohash":"{}","size":"N/A"}}]}}"#,
        fixtures::info_hash(4)
    );
    let source = JsonApiSource::new(
        "api",
        "https://api.example/?q={keywords}",
        JsonApiConfig::default(),
        50,
    )
    .unwrap();

    let results = source.parse_results(&body);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].size(), -1);
}

#[test]
fn test_parsing_is_deterministic() {
    // Undated rows are stamped with the parse time, so compare everything else.
    let listing = listing_source();
    let html = fixtures::html_listing(&[1, 2, 3, 4]);
    let project = |results: Vec<SearchResult>| -> Vec<(String, Option<String>, bool)> {
        results
            .into_iter()
            .map(|r| {
                (
                    r.display_name().to_string(),
                    r.details_url().map(str::to_string),
                    r.is_complete(),
                )
            })
            .collect()
    };
    let first = project(listing.parse_results(&html));
    assert_eq!(first.len(), 4);
    assert_eq!(first, project(listing.parse_results(&html)));

    let api = JsonApiSource::new(
        "api",
        "https://api.example/?q={keywords}",
        JsonApiConfig::default(),
        50,
    )
    .unwrap();
    let json = fixtures::json_listing(&[5, 6, 7]);
    assert_eq!(api.parse_results(&json), api.parse_results(&json));
}

#[tokio::test]
async fn test_stop_after_first_page_keeps_first_page_only() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .respond(
            "https://api.example/?q=sintel&page=1",
            fixtures::json_listing(&[1, 2]),
        )
        .await;
    fetcher
        .respond(
            "https://api.example/?q=sintel&page=2",
            fixtures::json_listing(&[3, 4]),
        )
        .await;

    let parse: Arc<dyn ParseStrategy> = Arc::new(
        JsonApiSource::new(
            "api",
            "https://api.example/?q={keywords}&page={page}",
            JsonApiConfig::default(),
            50,
        )
        .unwrap(),
    );
    let listener = Arc::new(StopAfterFirstBatch::default());
    let performer = Performer::new(
        QueryToken::new(),
        "sintel",
        parse,
        None,
        fetcher.clone(),
        listener.clone(),
        options(3, 0),
    );
    let _ = listener.stop.set(performer.stop_handle());

    let outcome = performer.perform().await.unwrap();
    assert_eq!(
        outcome,
        PerformOutcome::Stopped {
            emitted: 2,
            reason: StopReason::Cancelled
        }
    );

    let names: Vec<String> = listener
        .inner
        .results()
        .iter()
        .map(|r| r.display_name().to_string())
        .collect();
    assert_eq!(names, vec!["Item 1", "Item 2"]);
    assert_eq!(
        fetcher.requested_urls().await,
        vec!["https://api.example/?q=sintel&page=1"]
    );
}

#[tokio::test]
async fn test_crawl_budget_bounds_detail_fetches() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .respond(
            "https://listing.example/search?q=sintel",
            fixtures::html_listing(&[1, 2, 3, 4, 5]),
        )
        .await;
    serve_details(&fetcher, &[1, 2, 3, 4, 5]).await;

    let listener = Arc::new(RecordingListener::new());
    let performer = Performer::new(
        QueryToken::new(),
        "sintel",
        listing_source(),
        Some(crawler(fetcher.clone(), 3)),
        fetcher.clone(),
        listener.clone(),
        options(1, 2),
    );

    let outcome = performer.perform().await.unwrap();
    assert_eq!(outcome, PerformOutcome::Finished { emitted: 2 });

    let results = listener.results();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_complete()));
    assert_eq!(results[0].display_name(), "Item 1");
    assert_eq!(results[1].display_name(), "Item 2");
    // One listing page plus the budgeted detail pages.
    assert_eq!(fetcher.request_count().await, 3);
}

#[tokio::test]
async fn test_crawl_limited_to_remaining_room() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .respond(
            "https://listing.example/search?q=sintel",
            fixtures::html_listing(&[1, 2, 3, 4, 5]),
        )
        .await;
    serve_details(&fetcher, &[1, 2, 3, 4, 5]).await;

    let listener = Arc::new(RecordingListener::new());
    let performer = Performer::new(
        QueryToken::new(),
        "sintel",
        listing_source(),
        Some(crawler(fetcher.clone(), 3)),
        fetcher.clone(),
        listener.clone(),
        PerformerOptions {
            max_results: 2,
            ..options(1, 10)
        },
    );

    let outcome = performer.perform().await.unwrap();
    assert_eq!(outcome, PerformOutcome::Finished { emitted: 2 });
    let mut urls = fetcher.requested_urls().await;
    urls.sort();
    assert_eq!(
        urls,
        vec![
            "https://listing.example/search?q=sintel".to_string(),
            "https://listing.example/torrent/1/".to_string(),
            "https://listing.example/torrent/2/".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_failed_detail_fetch_shrinks_batch() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .respond(
            "https://listing.example/search?q=sintel",
            fixtures::html_listing(&[1, 2, 3]),
        )
        .await;
    // Item 2 has no detail page and answers 404.
    serve_details(&fetcher, &[1, 3]).await;

    let listener = Arc::new(RecordingListener::new());
    let performer = Performer::new(
        QueryToken::new(),
        "sintel",
        listing_source(),
        Some(crawler(fetcher.clone(), 2)),
        fetcher.clone(),
        listener.clone(),
        options(1, 10),
    );

    performer.perform().await.unwrap();

    let names: Vec<String> = listener
        .results()
        .iter()
        .map(|r| r.display_name().to_string())
        .collect();
    assert_eq!(names, vec!["Item 1", "Item 3"]);
}

#[tokio::test]
async fn test_no_fetch_after_stop() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .respond(
            "https://listing.example/search?q=sintel",
            fixtures::html_listing(&[1, 2, 3, 4]),
        )
        .await;
    serve_details(&fetcher, &[1, 2, 3, 4]).await;

    let listener = Arc::new(RecordingListener::new());
    let performer = Performer::new(
        QueryToken::new(),
        "sintel",
        listing_source(),
        Some(crawler(fetcher.clone(), 1)),
        fetcher.clone(),
        listener.clone(),
        options(1, 10),
    );

    // Stop while the first detail page is being fetched.
    let stop = performer.stop_handle();
    fetcher
        .on_fetch(move |url| {
            if url.contains("/torrent/") {
                stop.stop();
            }
        })
        .await;

    let outcome = performer.perform().await.unwrap();
    assert!(matches!(
        outcome,
        PerformOutcome::Stopped {
            reason: StopReason::Cancelled,
            ..
        }
    ));
    assert_eq!(fetcher.request_count().await, 2);
    assert_eq!(listener.batch_count(), 0);
}

#[tokio::test]
async fn test_manager_runs_registry_sources() {
    let config = load_config_from_str(
        r#"
[[sources]]
name = "api"
kind = "json_api"
search_url = "https://api.example/?q={keywords}"

[[sources]]
name = "listing"
kind = "regex_listing"
search_url = "https://listing.example/search?q={keywords}"
pattern = '<td class="name"><a href="(?<detailsurl>[^"]+)">(?<displayname>[^<]+)</a></td>'
details_prefix = "https://listing.example"

[sources.crawl]
pattern = '(?s)href="(?<magnet>magnet:[^"]+)".*?class="seeds">(?<seeds>\d+)<'
"#,
    )
    .unwrap();

    let fetcher = Arc::new(MockFetcher::new());
    fetcher
        .respond(
            "https://api.example/?q=big%20buck",
            fixtures::json_listing(&[1, 2]),
        )
        .await;
    fetcher
        .respond(
            "https://listing.example/search?q=big%20buck",
            fixtures::html_listing(&[3]),
        )
        .await;
    serve_details(&fetcher, &[3]).await;

    let (registry, errors) = SourceRegistry::from_config(&config, fetcher.clone());
    assert!(errors.is_empty());

    let manager = SearchManager::new(4);
    let mut signals = manager.subscribe().unwrap();
    let token = QueryToken::new();
    let handles = manager.perform_all(registry.performers(token, "big buck", manager.listener()));
    for handle in handles {
        handle.await.unwrap();
    }

    let mut by_source: Vec<(String, usize)> = Vec::new();
    let mut ended = false;
    while let Ok(signal) = signals.try_recv() {
        match signal {
            SearchSignal::Results { source, batch, .. } => by_source.push((source, batch.len())),
            SearchSignal::End { token: ended_token } => {
                assert_eq!(ended_token, token);
                ended = true;
            }
        }
    }
    by_source.sort();
    assert_eq!(
        by_source,
        vec![("api".to_string(), 2), ("listing".to_string(), 1)]
    );
    assert!(ended);
    assert!(!manager.is_active(token));
}

#[tokio::test]
async fn test_second_perform_rejected() {
    let fetcher = Arc::new(MockFetcher::new());
    let performer: Arc<dyn SearchPerformer> = Arc::new(Performer::new(
        QueryToken::new(),
        "x",
        listing_source(),
        None,
        fetcher,
        Arc::new(RecordingListener::new()),
        options(1, 0),
    ));

    // The listing answers 404, which ends the first run as a failure.
    let first = performer.perform().await.unwrap();
    assert!(matches!(
        first,
        PerformOutcome::Stopped {
            reason: StopReason::FetchFailed(_),
            ..
        }
    ));
    assert!(performer.perform().await.is_err());
}

#[tokio::test]
async fn test_resolver_results_through_manager() {
    let meta = r#"{"id":"abc","title":"Sintel","extractor":"vimeo","webpage_url":"https://vimeo.example/1","upload_date":"20200324","formats":[{"url":"https://cdn.example/v.mp4","ext":"mp4","acodec":"mp4a","vcodec":"avc1","width":1280,"height":720}]}"#;
    let events = Arc::new(ScriptedEventSource::new(vec![
        ResolverEvent::Destination {
            filename: "Sintel.mp4".to_string(),
        },
        ResolverEvent::Meta {
            json: meta.to_string(),
        },
        ResolverEvent::Finished { exit_code: 0 },
    ]));
    let mut registry = SourceRegistry::new(Arc::new(MockFetcher::new()));
    registry.set_resolver(events.clone(), Duration::from_secs(5));

    let manager = SearchManager::new(2);
    let mut signals = manager.subscribe().unwrap();
    let token = QueryToken::new();
    let performer = registry
        .resolver_performer(token, "https://vimeo.example/1", manager.listener())
        .unwrap();
    manager.perform(performer).await.unwrap();

    match signals.try_recv().unwrap() {
        SearchSignal::Results { source, batch, .. } => {
            assert_eq!(source, "Cloud:vimeo");
            assert_eq!(batch.len(), 1);
            assert_eq!(batch[0].display_name(), "(1280x720) Sintel");
            assert!(batch[0].stream().is_some());
        }
        other => panic!("expected results, got {:?}", other),
    }
    assert!(matches!(
        signals.try_recv().unwrap(),
        SearchSignal::End { token: t } if t == token
    ));
    assert_eq!(events.start_count(), 1);
}

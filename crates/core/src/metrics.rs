//! Prometheus metrics for search components.
//!
//! This module provides metrics for:
//! - Fetches (listing pages, detail pages, outcome, latency)
//! - Performers (results emitted, records skipped, run outcomes)

use std::time::Instant;

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

// =============================================================================
// Fetch Metrics
// =============================================================================

/// Fetches total by kind and result.
pub static FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dragnet_fetches_total", "Total page fetches"),
        &["kind", "result"], // kind: "listing", "detail"; result: "ok", "error"
    )
    .unwrap()
});

/// Fetch duration in seconds.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("dragnet_fetch_duration_seconds", "Duration of page fetches")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Performer Metrics
// =============================================================================

/// Results emitted to listeners, by source.
pub static RESULTS_EMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dragnet_results_emitted_total", "Total results emitted"),
        &["source"],
    )
    .unwrap()
});

/// Records skipped during parsing, by source.
pub static RECORDS_SKIPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "dragnet_records_skipped_total",
            "Total malformed or incomplete records skipped",
        ),
        &["source"],
    )
    .unwrap()
});

/// Performer runs by outcome.
pub static PERFORMER_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dragnet_performer_runs_total", "Total performer runs"),
        &["outcome"], // "finished", "cancelled", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Record one fetch outcome and its latency.
pub fn record_fetch(kind: &str, started: Instant, ok: bool) {
    FETCHES
        .with_label_values(&[kind, if ok { "ok" } else { "error" }])
        .inc();
    FETCH_DURATION
        .with_label_values(&[kind])
        .observe(started.elapsed().as_secs_f64());
}

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(FETCHES.clone()),
        Box::new(FETCH_DURATION.clone()),
        Box::new(RESULTS_EMITTED.clone()),
        Box::new(RECORDS_SKIPPED.clone()),
        Box::new(PERFORMER_RUNS.clone()),
    ]
}

/// Register every metric in `registry`.
pub fn register_metrics(registry: &Registry) -> prometheus::Result<()> {
    for metric in all_metrics() {
        registry.register(metric)?;
    }
    Ok(())
}

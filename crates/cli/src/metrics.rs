//! Prometheus exposition for a finished run.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};

use dragnet_core::metrics::register_metrics;

/// Registry holding every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    if let Err(e) = register_metrics(&registry) {
        tracing::warn!(error = %e, "Failed to register metrics");
    }
    registry
});

/// Encode all metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics are not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dragnet_core::metrics::PERFORMER_RUNS;

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        PERFORMER_RUNS.with_label_values(&["finished"]).inc();

        let output = encode_metrics().unwrap();
        assert!(output.contains("dragnet_performer_runs_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }
}

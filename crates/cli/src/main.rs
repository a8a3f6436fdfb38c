mod args;
mod metrics;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dragnet_core::{
    load_config, validate_config, QueryToken, ReqwestFetcher, SearchManager, SearchPerformer,
    SearchSignal, SourceRegistry,
};

use args::{Args, Query};

#[tokio::main]
async fn main() {
    // Usage errors and --help exit here, before logging starts
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    // Logs go to stderr, results to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = std::env::var("DRAGNET_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("dragnet.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let fetcher = Arc::new(ReqwestFetcher::new().context("Failed to create HTTP client")?);
    let (registry, errors) = SourceRegistry::from_config(&config, fetcher);
    for e in &errors {
        error!("Source not usable: {}", e);
    }

    let manager = SearchManager::new(config.search.max_parallel_performers);
    let mut signals = manager
        .subscribe()
        .context("Search signals already taken")?;
    let token = QueryToken::new();

    let performers: Vec<Arc<dyn SearchPerformer>> = match &args.query() {
        Query::Keywords(keywords) => {
            info!(%token, sources = registry.len(), "Searching for {:?}", keywords);
            registry.performers(token, keywords, manager.listener())
        }
        Query::Url(url) => {
            info!(%token, "Resolving {}", url);
            match registry.resolver_performer(token, url, manager.listener()) {
                Some(performer) => vec![performer],
                None => bail!("No [resolver] configured for media page URLs"),
            }
        }
    };
    if performers.is_empty() {
        bail!("No usable sources configured");
    }
    manager.perform_all(performers);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut stopping = false;
    let mut printed = 0usize;

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Some(SearchSignal::Results { token: t, source, batch }) if t == token => {
                    let mut stdout = std::io::stdout().lock();
                    for result in &batch {
                        let line = serde_json::to_string(result)
                            .context("Failed to serialize result")?;
                        writeln!(stdout, "{}", line).context("Failed to write result")?;
                    }
                    printed += batch.len();
                    info!(source = %source, count = batch.len(), "Batch received");
                }
                Some(SearchSignal::End { token: t }) if t == token => break,
                Some(_) => {}
                None => {
                    warn!("Signal channel closed before the search ended");
                    break;
                }
            },
            _ = &mut shutdown, if !stopping => {
                info!("Interrupted, stopping search");
                stopping = true;
                manager.stop(token);
            }
        }
    }

    info!(results = printed, "Search finished");

    if args.metrics {
        eprint!("{}", metrics::encode_metrics()?);
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

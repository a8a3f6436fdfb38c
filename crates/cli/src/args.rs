//! Command-line arguments.

use clap::Parser;

/// What to look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Free-text search across every configured source.
    Keywords(String),
    /// A media page handed to the cloud resolver.
    Url(String),
}

/// Federated torrent and media search.
///
/// Results are printed to stdout as JSON lines, logs go to stderr. The
/// configuration file is read from `$DRAGNET_CONFIG` or `./dragnet.toml`.
#[derive(Debug, Parser)]
#[command(name = "dragnet")]
#[command(version)]
pub struct Args {
    /// Print Prometheus metrics to stderr once the search ends
    #[arg(long)]
    pub metrics: bool,

    /// Keywords to search for, or a single media page URL to resolve
    #[arg(required = true, num_args = 1.., value_name = "QUERY", value_parser = non_blank)]
    words: Vec<String>,
}

impl Args {
    pub fn query(&self) -> Query {
        let text = self.words.join(" ");
        if self.words.len() == 1 && is_url(&text) {
            Query::Url(text)
        } else {
            Query::Keywords(text)
        }
    }
}

fn non_blank(word: &str) -> Result<String, String> {
    let word = word.trim();
    if word.is_empty() {
        return Err("query words cannot be blank".to_string());
    }
    Ok(word.to_string())
}

fn is_url(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

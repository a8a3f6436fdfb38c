use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Search limits are not 0
/// - Source names are unique and non-empty
/// - Every source URL has a `{keywords}` placeholder
/// - Resolver program is set when a resolver is configured
///
/// Pattern compilation is left to source registration, which reports
/// failures per source.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let search = &config.search;
    for (field, value) in [
        ("timeout_secs", search.timeout_secs as usize),
        ("max_results", search.max_results),
        ("max_pages", search.max_pages as usize),
        ("crawl_fanout", search.crawl_fanout),
        ("max_parallel_performers", search.max_parallel_performers),
    ] {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "search.{} cannot be 0",
                field
            )));
        }
    }

    let mut names = HashSet::new();
    for source in &config.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "sources.name cannot be empty".to_string(),
            ));
        }
        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate source name: {}",
                source.name
            )));
        }
        if !source.search_url.contains("{keywords}") {
            return Err(ConfigError::ValidationError(format!(
                "source {}: search_url must contain {{keywords}}",
                source.name
            )));
        }
        if source.max_results == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "source {}: max_results cannot be 0",
                source.name
            )));
        }
    }

    if let Some(resolver) = &config.resolver {
        if resolver.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "resolver.program cannot be empty".to_string(),
            ));
        }
        if resolver.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "resolver.timeout_secs cannot be 0".to_string(),
            ));
        }
    }

    Ok(())
}

pub mod config;
pub mod dispatcher;
pub mod fetch;
pub mod matcher;
pub mod metrics;
pub mod normalize;
pub mod performer;
pub mod registry;
pub mod resolver;
pub mod result;
pub mod source;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SourceConfig,
    SourceKind,
};
pub use dispatcher::SearchManager;
pub use fetch::{FetchError, HttpFetch, ReqwestFetcher};
pub use performer::{
    PerformOutcome, Performer, PerformerOptions, PerformerState, QueryToken, ResultListener,
    SearchPerformer, SearchSignal, StopReason,
};
pub use registry::{RegisteredSource, SourceRegistry};
pub use resolver::{CloudResolverPerformer, ResolverError, ResolverEvent};
pub use result::SearchResult;
pub use source::StrategyConfigError;

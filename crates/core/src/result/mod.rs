//! Normalized search result model.
//!
//! One `SearchResult` type carries optional capability facets instead of a
//! class per result kind. Values are immutable once built; "updating" a
//! result means building a new one.

mod builder;
mod types;

pub use builder::{SearchResultBuilder, ValidationError};
pub use types::*;

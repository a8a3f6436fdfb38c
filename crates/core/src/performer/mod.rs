//! Performers: one object per (query, source) pair.

mod listener;
mod runner;
mod types;

pub use listener::{ChannelListener, ResultListener, SearchPerformer, SearchSignal};
pub use runner::Performer;
pub use types::*;

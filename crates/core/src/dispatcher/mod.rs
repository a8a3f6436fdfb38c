//! Query dispatcher: runs performers on a bounded worker pool and merges
//! their output into one signal stream.

mod manager;

pub use manager::SearchManager;

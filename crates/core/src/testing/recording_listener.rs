//! Listener that keeps every batch it receives.

use std::sync::Mutex;

use crate::performer::{QueryToken, ResultListener};
use crate::result::SearchResult;

/// A batch as delivered to the listener.
#[derive(Debug, Clone)]
pub struct RecordedBatch {
    pub token: QueryToken,
    pub source: String,
    pub results: Vec<SearchResult>,
}

/// Listener that records batches for assertions.
#[derive(Debug, Default)]
pub struct RecordingListener {
    batches: Mutex<Vec<RecordedBatch>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every batch received, in delivery order.
    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.lock().clone()
    }

    /// All results across batches, in delivery order.
    pub fn results(&self) -> Vec<SearchResult> {
        self.lock()
            .iter()
            .flat_map(|b| b.results.iter().cloned())
            .collect()
    }

    pub fn batch_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedBatch>> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResultListener for RecordingListener {
    fn on_results(&self, token: QueryToken, source: &str, batch: Vec<SearchResult>) {
        self.lock().push(RecordedBatch {
            token,
            source: source.to_string(),
            results: batch,
        });
    }
}

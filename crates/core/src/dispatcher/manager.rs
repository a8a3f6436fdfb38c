use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::performer::{
    ChannelListener, QueryToken, ResultListener, SearchPerformer, SearchSignal,
};

type ActiveMap = HashMap<QueryToken, Vec<(u64, Arc<dyn SearchPerformer>)>>;

/// Runs performers for any number of concurrent queries.
///
/// At most `max_parallel` performers run at once; the rest wait for a permit.
/// Each performer runs in its own task, so one source failing never affects
/// another. Once the last performer of a token completes, a
/// [`SearchSignal::End`] for that token follows its final results.
pub struct SearchManager {
    permits: Arc<Semaphore>,
    tx: mpsc::UnboundedSender<SearchSignal>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<SearchSignal>>>,
    active: Arc<Mutex<ActiveMap>>,
    next_id: AtomicU64,
}

fn lock(active: &Mutex<ActiveMap>) -> MutexGuard<'_, ActiveMap> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SearchManager {
    pub fn new(max_parallel: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            permits: Arc::new(Semaphore::new(max_parallel.max(1))),
            tx,
            rx: Mutex::new(Some(rx)),
            active: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Listener that feeds this manager's signal stream. Hand it to every
    /// performer the manager will run.
    pub fn listener(&self) -> Arc<dyn ResultListener> {
        Arc::new(ChannelListener::new(self.tx.clone()))
    }

    /// Take the signal stream. Only the first call gets it.
    pub fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<SearchSignal>> {
        self.rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Queue a performer. It starts as soon as a worker permit is free.
    pub fn perform(&self, performer: Arc<dyn SearchPerformer>) -> JoinHandle<()> {
        let id = self.register(&performer);
        self.spawn(id, performer)
    }

    /// Queue several performers for the same or different queries.
    ///
    /// All are registered before any starts, so a quick performer cannot end
    /// its query while siblings are still being queued.
    pub fn perform_all(
        &self,
        performers: impl IntoIterator<Item = Arc<dyn SearchPerformer>>,
    ) -> Vec<JoinHandle<()>> {
        let queued: Vec<(u64, Arc<dyn SearchPerformer>)> = performers
            .into_iter()
            .map(|p| (self.register(&p), p))
            .collect();
        queued
            .into_iter()
            .map(|(id, p)| self.spawn(id, p))
            .collect()
    }

    fn register(&self, performer: &Arc<dyn SearchPerformer>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.active)
            .entry(performer.token())
            .or_default()
            .push((id, performer.clone()));
        id
    }

    fn spawn(&self, id: u64, performer: Arc<dyn SearchPerformer>) -> JoinHandle<()> {
        let token = performer.token();
        let permits = self.permits.clone();
        let active = self.active.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            match permits.acquire_owned().await {
                Ok(_permit) => match performer.perform().await {
                    Ok(outcome) => debug!(
                        source = %performer.source(),
                        token = %token,
                        outcome = outcome.label(),
                        emitted = outcome.emitted(),
                        "Performer completed"
                    ),
                    Err(e) => warn!(
                        source = %performer.source(),
                        token = %token,
                        error = %e,
                        "Performer could not run"
                    ),
                },
                Err(_) => warn!(token = %token, "Worker pool closed"),
            }

            let finished_token = {
                let mut active = lock(&active);
                match active.get_mut(&token) {
                    Some(performers) => {
                        performers.retain(|(pid, _)| *pid != id);
                        if performers.is_empty() {
                            active.remove(&token);
                            true
                        } else {
                            false
                        }
                    }
                    None => false,
                }
            };
            if finished_token {
                debug!(token = %token, "Query finished");
                let _ = tx.send(SearchSignal::End { token });
            }
        })
    }

    /// Stop every performer of one query. Queued performers end without
    /// touching the network; running ones stop at their next check.
    pub fn stop(&self, token: QueryToken) {
        if let Some(performers) = lock(&self.active).get(&token) {
            debug!(token = %token, count = performers.len(), "Stopping query");
            for (_, performer) in performers {
                performer.stop();
            }
        }
    }

    /// Stop every performer of every query.
    pub fn stop_all(&self) {
        for performers in lock(&self.active).values() {
            for (_, performer) in performers {
                performer.stop();
            }
        }
    }

    /// Number of performers queued or running.
    pub fn active_count(&self) -> usize {
        lock(&self.active).values().map(Vec::len).sum()
    }

    /// Whether any performer of `token` is queued or running.
    pub fn is_active(&self, token: QueryToken) -> bool {
        lock(&self.active).contains_key(&token)
    }
}

//! Scripted resolver event source for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::resolver::{EventSource, ResolverError, ResolverEvent};

/// Event source that replays a fixed list of events.
///
/// The channel closes after the last event unless [`hold_open`](Self::hold_open)
/// was called, in which case it stays open (silent resolver) for as long as
/// the source lives.
#[derive(Debug, Default)]
pub struct ScriptedEventSource {
    events: Vec<ResolverEvent>,
    start_error: Option<String>,
    hold_open: bool,
    held: Mutex<Vec<mpsc::Sender<ResolverEvent>>>,
    starts: AtomicUsize,
}

impl ScriptedEventSource {
    pub fn new(events: Vec<ResolverEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    /// A source whose start always fails.
    pub fn failing(message: &str) -> Self {
        Self {
            start_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Keep the channel open after the scripted events.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Number of times `start` was called.
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl EventSource for ScriptedEventSource {
    fn start(&self, _url: &str) -> Result<mpsc::Receiver<ResolverEvent>, ResolverError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.start_error {
            return Err(ResolverError::Process(message.clone()));
        }

        let (tx, rx) = mpsc::channel(self.events.len().max(1));
        for event in &self.events {
            let _ = tx.try_send(event.clone());
        }
        if self.hold_open {
            self.held
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(tx);
        }
        Ok(rx)
    }
}

//! Event sink trait and implementations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::Event;

/// Receives ledger events after a transaction has been applied.
///
/// `emit()` must be fast and non-blocking. Failure to emit must not affect
/// the ledger.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);

    /// Default implementation calls `emit()` for each event.
    fn emit_batch(&self, events: Vec<Event>) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Discards every event.
#[derive(Clone, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: Event) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Clone, Default)]
pub struct CollectingEventSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    /// Removes and returns everything collected so far.
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: Event) {
        self.lock().push(event);
    }
}

//! Single-writer, multi-reader event counter.
//!
//! The monitor that owns an [`EventCounter`] is the only writer. Any number of
//! [`EventCounterHandle`]s may read the count and latch from other threads.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Shared {
    events: AtomicUsize,
    latch: AtomicBool,
}

/// Writer side of the counter. Deliberately not `Clone`.
#[derive(Debug, Default)]
pub struct EventCounter {
    shared: Arc<Shared>,
}

impl EventCounter {
    /// Creates a counter at zero with the latch cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event and sets the latch.
    pub(crate) fn record(&mut self) {
        self.shared.events.fetch_add(1, Ordering::Release);
        self.shared.latch.store(true, Ordering::Release);
    }

    /// Clears the latch. The event count is untouched.
    pub(crate) fn clear_latch(&mut self) {
        self.shared.latch.store(false, Ordering::Release);
    }

    /// Returns the total number of events recorded.
    pub fn events(&self) -> usize {
        self.shared.events.load(Ordering::Acquire)
    }

    /// Returns the latch state.
    pub fn latch(&self) -> bool {
        self.shared.latch.load(Ordering::Acquire)
    }

    /// Returns a read-only handle that can be sent to another thread.
    pub fn handle(&self) -> EventCounterHandle {
        EventCounterHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Read-only view of an [`EventCounter`].
#[derive(Debug, Clone)]
pub struct EventCounterHandle {
    shared: Arc<Shared>,
}

impl EventCounterHandle {
    /// Returns the total number of events recorded.
    pub fn events(&self) -> usize {
        self.shared.events.load(Ordering::Acquire)
    }

    /// Returns the latch state.
    pub fn latch(&self) -> bool {
        self.shared.latch.load(Ordering::Acquire)
    }
}

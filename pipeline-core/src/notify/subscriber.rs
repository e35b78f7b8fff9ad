//! Subscriber identity and the observer callback surface.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::Observable;

/// Unique identifier for an observer.
///
/// Every observer (in practice, every node) gets a unique ID when created.
/// Observables key their attachments on it, and the graph algorithms use it
/// as node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Callbacks delivered by an [`Observable`](super::Observable).
///
/// Both default to doing nothing.
pub trait Observer {
    /// The observed target changed.
    ///
    /// Returning an observable forwards the change to that observable's own
    /// observers. The notifying side drains forwarded changes in a loop, so
    /// a long chain of observers does not deepen the call stack.
    fn target_changed(&self) -> Option<Rc<Observable>> {
        None
    }

    /// The observed target is being destroyed.
    ///
    /// Called before any of the target's state is torn down. The target
    /// will not call this observer again.
    fn target_deleted(&self) {}
}

//! The observable side of the notification channel.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use super::{Observer, SubscriberId};
use crate::error::{PipelineError, Result};

/// Snapshot of observers taken before delivering callbacks.
///
/// Callbacks may attach or detach observers, so the map is never borrowed
/// while one runs.
type Snapshot = SmallVec<[Weak<dyn Observer>; 4]>;

/// A target that observers can attach to.
#[derive(Default)]
pub struct Observable {
    observers: RefCell<IndexMap<SubscriberId, Weak<dyn Observer>>>,
}

impl Observable {
    /// Create an observable with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer` under `id`.
    ///
    /// Attaching an ID that is already present replaces its entry. Fails
    /// with [`PipelineError::InvalidSubscription`] if the observer no longer
    /// exists.
    pub fn attach(&self, id: SubscriberId, observer: Weak<dyn Observer>) -> Result<()> {
        if observer.strong_count() == 0 {
            return Err(PipelineError::InvalidSubscription);
        }
        self.observers.borrow_mut().insert(id, observer);
        Ok(())
    }

    /// Remove the observer registered under `id`. Idempotent.
    pub fn detach(&self, id: SubscriberId) {
        self.observers.borrow_mut().shift_remove(&id);
    }

    /// Whether an observer is registered under `id`.
    pub fn is_attached(&self, id: SubscriberId) -> bool {
        self.observers.borrow().contains_key(&id)
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Tell every attached observer that this target changed, then follow
    /// the changes they forward until none are left.
    ///
    /// Uses an explicit worklist, so the depth of the observer graph does
    /// not matter.
    pub fn changed(&self) {
        let mut pending: Vec<Weak<dyn Observer>> = self.snapshot().into_vec();
        let mut delivered = 0usize;

        while let Some(observer) = pending.pop() {
            let Some(observer) = observer.upgrade() else {
                continue;
            };
            delivered += 1;
            if let Some(next) = observer.target_changed() {
                pending.extend(next.snapshot());
            }
        }
        trace!(delivered, "change delivered");
    }

    fn snapshot(&self) -> Snapshot {
        self.observers.borrow().values().cloned().collect()
    }

    /// Tell every attached observer that this target is going away, and
    /// forget them all.
    ///
    /// Runs at most once per attachment: observers are removed before they
    /// are called, so nothing is ever redelivered to them.
    pub fn notify_deleted(&self) {
        let observers = std::mem::take(&mut *self.observers.borrow_mut());
        if observers.is_empty() {
            return;
        }
        trace!(observers = observers.len(), "delivering deletion notice");
        for observer in observers.values().filter_map(Weak::upgrade) {
            observer.target_deleted();
        }
    }
}

impl Drop for Observable {
    fn drop(&mut self) {
        self.notify_deleted();
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

/// An observer's attachment to one target.
///
/// Dropping the subscription detaches the observer, so an attachment never
/// outlives the observer holding it. If the target is already gone, the
/// drop does nothing.
pub struct Subscription {
    target: Weak<Observable>,
    id: SubscriberId,
}

impl Subscription {
    /// Attach `observer` to `target` and return the guard for it.
    pub fn attach(
        target: &Rc<Observable>,
        id: SubscriberId,
        observer: Weak<dyn Observer>,
    ) -> Result<Self> {
        target.attach(id, observer)?;
        Ok(Self {
            target: Rc::downgrade(target),
            id,
        })
    }

    /// Whether the target is still alive.
    pub fn is_live(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(target) = self.target.upgrade() {
            target.detach(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

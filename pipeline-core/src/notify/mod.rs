//! Change Notification
//!
//! A minimal two-role protocol that lets one entity learn when another
//! changes or is destroyed.
//!
//! # Roles
//!
//! - An [`Observable`] keeps the set of observers attached to it and calls
//!   them synchronously when it changes (`target_changed`) and when it is
//!   torn down (`target_deleted`).
//! - An [`Observer`] receives those callbacks. It holds its attachment as a
//!   [`Subscription`], which detaches itself when dropped.
//!
//! Observers are stored as `Weak` references keyed by [`SubscriberId`], so
//! neither side keeps the other alive and a dead observer is never called.
//!
//! Graph nodes play both roles: consumers observe their producers, and are
//! themselves observed by their own consumers. This is what drives the
//! invalidation cascade. A node that becomes Invalid forwards the change to
//! its own observable instead of notifying it directly, and
//! [`Observable::changed`] drains those forwards from a worklist.

mod observable;
mod subscriber;

pub use observable::{Observable, Subscription};
pub use subscriber::{Observer, SubscriberId};

//! Output ports.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{PipelineError, Result};
use crate::graph::NodeBase;

/// Type-erased view of an output port.
pub trait OutputPortBase: Any {
    /// Whether the port currently holds a value.
    fn is_data_available(&self) -> bool;

    /// Drop the held value, if any.
    fn clear(&self);

    /// The node this port belongs to, if it is still alive.
    fn owner(&self) -> Option<Rc<dyn NodeBase>>;

    /// Whether the owning node is still alive and part of the graph.
    fn is_owner_alive(&self) -> bool;

    /// Name of the value type, for error reporting.
    fn value_type_name(&self) -> &'static str;

    /// Convert into `Rc<dyn Any>` so the concrete port can be recovered.
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// An output port holding zero or one value of type `T`.
///
/// The value is stored behind an `Rc`, so readers get a cheap shared handle
/// that stays valid even if the port is refilled later.
pub struct OutputPort<T> {
    owner: Weak<dyn NodeBase>,
    value: RefCell<Option<Rc<T>>>,
}

impl<T: 'static> OutputPort<T> {
    /// Create an empty port owned by `owner`.
    pub fn new(owner: Weak<dyn NodeBase>) -> Self {
        Self {
            owner,
            value: RefCell::new(None),
        }
    }

    /// The current value.
    ///
    /// Fails with [`PipelineError::DataUnavailable`] if nothing has been
    /// computed since the port was last cleared.
    pub fn get_data(&self) -> Result<Rc<T>> {
        self.value
            .borrow()
            .clone()
            .ok_or(PipelineError::DataUnavailable)
    }

    /// Store `value`, replacing any previous one.
    ///
    /// This does not notify anyone; the owning node does that.
    pub fn fill_data(&self, value: T) {
        *self.value.borrow_mut() = Some(Rc::new(value));
    }

    /// Drop the held value.
    pub fn clear(&self) {
        self.value.borrow_mut().take();
    }

    /// Whether the port currently holds a value.
    pub fn is_data_available(&self) -> bool {
        self.value.borrow().is_some()
    }
}

impl<T: 'static> OutputPortBase for OutputPort<T> {
    fn is_data_available(&self) -> bool {
        OutputPort::is_data_available(self)
    }

    fn clear(&self) {
        OutputPort::clear(self);
    }

    fn owner(&self) -> Option<Rc<dyn NodeBase>> {
        self.owner.upgrade()
    }

    fn is_owner_alive(&self) -> bool {
        self.owner
            .upgrade()
            .is_some_and(|owner| !owner.is_retired())
    }

    fn value_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl<T> fmt::Debug for OutputPort<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputPort")
            .field("value_type", &type_name::<T>())
            .field("has_value", &self.value.borrow().is_some())
            .finish()
    }
}

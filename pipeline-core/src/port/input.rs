//! Input ports.

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::{OutputPort, OutputPortBase};
use crate::error::{PipelineError, PortDirection, Result};
use crate::graph::NodeBase;

/// Type-erased view of an input port.
pub trait InputPortBase {
    /// Bind the port to `source`, or clear it with `None`.
    ///
    /// Fails with [`PipelineError::TypeMismatch`] if `source` holds another
    /// value type, in which case the previous binding is kept.
    fn connect(&self, source: Option<Rc<dyn OutputPortBase>>) -> Result<()>;

    /// Whether the port refers to a live output port.
    fn is_connected(&self) -> bool;

    /// Whether the connected output holds a value.
    ///
    /// Fails with [`PipelineError::NotConnected`] on an unconnected port.
    fn is_data_available(&self) -> Result<bool>;

    /// The node owning the connected output.
    fn connected_node(&self) -> Option<Rc<dyn NodeBase>>;

    /// The connected output port.
    fn connected_port(&self) -> Option<Rc<dyn OutputPortBase>>;

    /// Forget the binding if its producer is gone. Returns whether it did.
    fn prune(&self) -> bool;
}

/// An input port accepting values of type `T`.
///
/// Unconnected by default.
pub struct InputPort<T> {
    source: RefCell<Option<Weak<OutputPort<T>>>>,
}

impl<T: 'static> InputPort<T> {
    /// Create an unconnected port.
    pub fn new() -> Self {
        Self {
            source: RefCell::new(None),
        }
    }

    /// The connected output, if both it and its node are still alive.
    fn source(&self) -> Option<Rc<OutputPort<T>>> {
        self.source
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .filter(|port| port.is_owner_alive())
    }

    /// The value currently held by the connected output.
    ///
    /// Fails with [`PipelineError::NotConnected`] on an unconnected port and
    /// with [`PipelineError::DataUnavailable`] if the producer has not been
    /// evaluated.
    pub fn get_data(&self) -> Result<Rc<T>> {
        self.source()
            .ok_or(PipelineError::NotConnected)?
            .get_data()
    }
}

impl<T: 'static> Default for InputPort<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> InputPortBase for InputPort<T> {
    fn connect(&self, source: Option<Rc<dyn OutputPortBase>>) -> Result<()> {
        let Some(source) = source else {
            self.source.replace(None);
            return Ok(());
        };
        let found = source.value_type_name();
        let port = source
            .into_any()
            .downcast::<OutputPort<T>>()
            .map_err(|_| PipelineError::TypeMismatch {
                expected: type_name::<T>(),
                found,
            })?;
        self.source.replace(Some(Rc::downgrade(&port)));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.source().is_some()
    }

    fn is_data_available(&self) -> Result<bool> {
        self.source()
            .map(|port| port.is_data_available())
            .ok_or(PipelineError::NotConnected)
    }

    fn connected_node(&self) -> Option<Rc<dyn NodeBase>> {
        self.source().and_then(|port| port.owner())
    }

    fn connected_port(&self) -> Option<Rc<dyn OutputPortBase>> {
        self.source().map(|port| port as Rc<dyn OutputPortBase>)
    }

    fn prune(&self) -> bool {
        let dangling = self.source.borrow().is_some() && self.source().is_none();
        if dangling {
            self.source.replace(None);
        }
        dangling
    }
}

impl<T> fmt::Debug for InputPort<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputPort")
            .field("value_type", &type_name::<T>())
            .field("bound", &self.source.borrow().is_some())
            .finish()
    }
}

/// Stand-in input for nodes that take no inputs.
///
/// Always connected and always available, so zero-input nodes share the
/// evaluation path of every other node. It cannot be connected.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderInput;

impl InputPortBase for PlaceholderInput {
    fn connect(&self, _source: Option<Rc<dyn OutputPortBase>>) -> Result<()> {
        Err(PipelineError::IndexOutOfRange {
            direction: PortDirection::Input,
            index: 0,
            arity: 0,
        })
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn is_data_available(&self) -> Result<bool> {
        Ok(true)
    }

    fn connected_node(&self) -> Option<Rc<dyn NodeBase>> {
        None
    }

    fn connected_port(&self) -> Option<Rc<dyn OutputPortBase>> {
        None
    }

    fn prune(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Constant, Node};

    #[test]
    fn unconnected_port_reports_not_connected() {
        let port = InputPort::<i32>::new();
        assert!(!port.is_connected());
        assert_eq!(port.is_data_available(), Err(PipelineError::NotConnected));
        assert_eq!(port.get_data(), Err(PipelineError::NotConnected));
        assert!(port.connected_node().is_none());
    }

    #[test]
    fn connect_checks_value_type() {
        let ints = Node::new(Constant::new(5));
        let floats = Node::new(Constant::new(5.0_f32));
        let port = InputPort::<i32>::new();

        port.connect(Some(ints.outputs().0.clone())).unwrap();
        assert!(port.is_connected());

        let err = port.connect(Some(floats.outputs().0.clone())).unwrap_err();
        assert_eq!(
            err,
            PipelineError::TypeMismatch {
                expected: "i32",
                found: "f32",
            }
        );
        // the failed attempt kept the previous binding
        assert_eq!(
            port.connected_node().unwrap().subscriber_id(),
            ints.subscriber_id()
        );

        port.connect(None).unwrap();
        assert!(!port.is_connected());
    }

    #[test]
    fn data_follows_the_source() {
        let node = Node::new(Constant::new(11));
        let port = InputPort::<i32>::new();
        port.connect(Some(node.outputs().0.clone())).unwrap();

        assert_eq!(port.is_data_available(), Ok(false));
        assert_eq!(port.get_data(), Err(PipelineError::DataUnavailable));

        node.evaluate().unwrap();
        assert_eq!(port.is_data_available(), Ok(true));
        assert_eq!(*port.get_data().unwrap(), 11);
    }

    #[test]
    fn dropping_the_producer_disconnects() {
        let node = Node::new(Constant::new(1));
        let port = InputPort::<i32>::new();
        port.connect(Some(node.outputs().0.clone())).unwrap();

        drop(node);
        assert!(!port.is_connected());
        assert!(port.prune());
        assert!(!port.prune());
    }

    #[test]
    fn placeholder_is_always_ready() {
        let placeholder = PlaceholderInput;
        assert!(placeholder.is_connected());
        assert_eq!(placeholder.is_data_available(), Ok(true));
        assert!(matches!(
            placeholder.connect(None),
            Err(PipelineError::IndexOutOfRange { .. })
        ));
    }
}

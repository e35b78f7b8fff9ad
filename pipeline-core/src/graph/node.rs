//! Graph Nodes
//!
//! This module defines the processing unit of the graph: a [`Node`] wraps a
//! user-supplied [`Process`] together with its typed ports and its cache
//! state, and exposes the type-erased [`NodeBase`] surface that the
//! algorithms and the registry work with.
//!
//! # Cache state
//!
//! A node is either Valid (its outputs reflect its current inputs) or
//! Invalid (they must be recomputed). Nodes start Invalid. Evaluating an
//! Invalid node runs the process once and makes it Valid; evaluating a Valid
//! node does nothing.
//!
//! Connecting, disconnecting, mutating a node, or a producer changing or
//! being dropped makes the node Invalid, clears its outputs, and notifies
//! its own consumers, which do the same. The cascade is synchronous.

use std::any::{type_name, Any};
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::algorithms::is_dependent_on;
use crate::error::{PipelineError, PortDirection, Result};
use crate::notify::{Observable, Observer, SubscriberId, Subscription};
use crate::port::{InputPortBase, InputSet, OutputPortBase, OutputSet};

/// The transform a node performs.
///
/// Implementors fix the node's input and output value types and turn
/// references to the current inputs into one freshly owned value per
/// output, in port order.
///
/// The result is cached, so `process` should have no side effects that a
/// skipped re-run would hide, unless one run per invalidation is the point
/// (a printing sink, for example).
///
/// # Example
///
/// ```
/// use pipeline_core::{InputRefs, Process};
///
/// struct Add;
///
/// impl Process for Add {
///     type Inputs = (i32, i32);
///     type Outputs = (i32,);
///
///     fn process(&self, (a, b): InputRefs<'_, Self>) -> Self::Outputs {
///         (a + b,)
///     }
/// }
/// ```
pub trait Process: 'static {
    /// Input value types, e.g. `(i32, i32)`, or `()` for a source.
    type Inputs: InputSet;

    /// Output value types, e.g. `(i32,)`.
    type Outputs: OutputSet;

    /// Compute the outputs from the current inputs.
    fn process(&self, inputs: InputRefs<'_, Self>) -> Self::Outputs;
}

/// The input references handed to [`Process::process`].
pub type InputRefs<'a, P> = <<P as Process>::Inputs as InputSet>::Refs<'a>;

type InputPorts<P> = <<P as Process>::Inputs as InputSet>::Ports;
type OutputPorts<P> = <<P as Process>::Outputs as OutputSet>::Ports;

/// Type-erased node surface.
///
/// Everything the dependency algorithms and the registry need, independent
/// of a node's port types.
pub trait NodeBase: Observer {
    /// Identity of this node, stable for its lifetime.
    fn subscriber_id(&self) -> SubscriberId;

    /// Name of the node's process type.
    fn type_name(&self) -> &'static str;

    /// True iff every input port is connected.
    fn is_connected(&self) -> bool;

    /// True iff connected and every input currently has data.
    fn is_data_available(&self) -> bool;

    /// True iff the cached outputs reflect the current inputs.
    fn is_valid(&self) -> bool;

    /// Compute the outputs unless they are already valid.
    ///
    /// Fails with [`PipelineError::NotReady`] if some input lacks data.
    fn evaluate(&self) -> Result<()>;

    /// Mark the outputs stale and notify consumers.
    fn invalidate(&self);

    /// Take the node out of the graph for good.
    ///
    /// Consumers are disconnected and invalidated exactly as if the node had
    /// been dropped, even while strong handles to it are still held. A
    /// retired node cannot be connected or evaluated again.
    fn retire(&self);

    /// Whether [`retire`](NodeBase::retire) has been called.
    fn is_retired(&self) -> bool;

    /// The distinct nodes currently feeding this node's inputs.
    fn input_nodes(&self) -> Vec<Rc<dyn NodeBase>>;

    /// The output port at `index`.
    fn output_port(&self, index: usize) -> Result<Rc<dyn OutputPortBase>>;

    /// Feed input `input` from output `output` of `producer`.
    ///
    /// Fails with [`PipelineError::CyclicDependency`] if `producer` already
    /// depends on this node, leaving everything unchanged.
    fn connect(&self, producer: &dyn NodeBase, input: usize, output: usize) -> Result<()>;

    /// Unbind input `input`.
    fn disconnect(&self, input: usize) -> Result<()>;

    /// The target consumers subscribe to.
    fn observable(&self) -> &Rc<Observable>;

    /// Convert into `Rc<dyn Any>` so the concrete node can be recovered.
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// A node running process `P`.
///
/// Nodes live behind an `Rc`: other nodes refer to them weakly, and
/// dropping the last strong handle tells every consumer that it lost its
/// producer.
pub struct Node<P: Process> {
    /// Unique identifier for this node.
    id: SubscriberId,

    /// Weak handle to ourselves, used to subscribe to producers.
    this: Weak<Node<P>>,

    process: RefCell<P>,
    inputs: InputPorts<P>,
    outputs: OutputPorts<P>,

    /// Whether the outputs reflect the current inputs.
    valid: Cell<bool>,

    /// Set once the node has been removed from the graph.
    retired: Cell<bool>,

    /// Consumers watching this node.
    observable: Rc<Observable>,

    /// Our attachments to producers, one per distinct producer.
    subscriptions: RefCell<IndexMap<SubscriberId, Subscription>>,
}

impl<P: Process> Node<P> {
    /// Create an unconnected, Invalid node around `process`.
    pub fn new(process: P) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<Self>| {
            let owner: Weak<dyn NodeBase> = this.clone();
            Self {
                id: SubscriberId::new(),
                this: this.clone(),
                process: RefCell::new(process),
                inputs: Default::default(),
                outputs: P::Outputs::create_ports(&owner),
                valid: Cell::new(false),
                retired: Cell::new(false),
                observable: Rc::new(Observable::new()),
                subscriptions: RefCell::new(IndexMap::new()),
            }
        })
    }

    /// Borrow the process.
    pub fn inner(&self) -> Ref<'_, P> {
        self.process.borrow()
    }

    /// Mutate the process, then invalidate the node.
    pub fn update<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        let result = f(&mut self.process.borrow_mut());
        self.invalidate();
        result
    }

    /// The typed input ports.
    pub fn inputs(&self) -> &InputPorts<P> {
        &self.inputs
    }

    /// The typed output ports.
    pub fn outputs(&self) -> &OutputPorts<P> {
        &self.outputs
    }

    /// The type-erased input port at `index`.
    pub fn input(&self, index: usize) -> Result<&dyn InputPortBase> {
        P::Inputs::port(&self.inputs, index).ok_or(PipelineError::IndexOutOfRange {
            direction: PortDirection::Input,
            index,
            arity: P::Inputs::ARITY,
        })
    }

    /// Drop the outputs and become Invalid. Returns whether the node was
    /// Valid, i.e. whether consumers still have to hear about it.
    fn mark_invalid(&self) -> bool {
        // An Invalid node has no Valid consumers, so there is nothing to
        // propagate.
        if !self.valid.replace(false) {
            return false;
        }
        for port in P::Outputs::ports(&self.outputs) {
            port.clear();
        }
        trace!(node = self.id.raw(), "invalidated");
        true
    }

    /// Drop subscriptions to producers that no longer feed any input.
    fn release_stale_subscriptions(&self, producers: &[Rc<dyn NodeBase>]) {
        self.subscriptions
            .borrow_mut()
            .retain(|id, _| producers.iter().any(|p| p.subscriber_id() == *id));
    }

    /// Make the set of subscriptions match the set of connected producers.
    ///
    /// Two inputs fed by the same producer share one subscription, which is
    /// dropped only when neither is connected to it any more.
    fn sync_subscriptions(&self) -> Result<()> {
        let producers = self.input_nodes();
        self.release_stale_subscriptions(&producers);

        let mut subscriptions = self.subscriptions.borrow_mut();
        for producer in producers {
            let id = producer.subscriber_id();
            if subscriptions.contains_key(&id) {
                continue;
            }
            let observer: Weak<dyn Observer> = self.this.clone();
            let subscription = Subscription::attach(producer.observable(), self.id, observer)?;
            subscriptions.insert(id, subscription);
        }
        Ok(())
    }
}

impl<P: Process> NodeBase for Node<P> {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn type_name(&self) -> &'static str {
        type_name::<P>()
    }

    fn is_connected(&self) -> bool {
        P::Inputs::ports(&self.inputs)
            .iter()
            .all(|port| port.is_connected())
    }

    fn is_data_available(&self) -> bool {
        P::Inputs::ports(&self.inputs)
            .iter()
            .all(|port| port.is_data_available().unwrap_or(false))
    }

    fn is_valid(&self) -> bool {
        self.valid.get()
    }

    fn evaluate(&self) -> Result<()> {
        if self.retired.get() {
            return Err(PipelineError::Removed);
        }
        if self.valid.get() {
            trace!(node = self.id.raw(), "cache hit");
            return Ok(());
        }
        if !self.is_data_available() {
            return Err(PipelineError::NotReady);
        }

        let values = P::Inputs::values(&self.inputs)?;
        let outputs = self.process.borrow().process(P::Inputs::refs(&values));
        P::Outputs::fill(&self.outputs, outputs);
        self.valid.set(true);

        trace!(node = self.id.raw(), process = type_name::<P>(), "evaluated");
        Ok(())
    }

    fn invalidate(&self) {
        if self.mark_invalid() {
            self.observable.changed();
        }
    }

    fn retire(&self) {
        if self.retired.replace(true) {
            return;
        }
        self.mark_invalid();
        drop(std::mem::take(&mut *self.subscriptions.borrow_mut()));

        debug!(node = self.id.raw(), process = type_name::<P>(), "retired");
        self.observable.notify_deleted();
    }

    fn is_retired(&self) -> bool {
        self.retired.get()
    }

    fn input_nodes(&self) -> Vec<Rc<dyn NodeBase>> {
        let mut nodes: Vec<Rc<dyn NodeBase>> = Vec::new();
        for node in P::Inputs::ports(&self.inputs)
            .iter()
            .filter_map(|port| port.connected_node())
        {
            if !nodes.iter().any(|n| n.subscriber_id() == node.subscriber_id()) {
                nodes.push(node);
            }
        }
        nodes
    }

    fn output_port(&self, index: usize) -> Result<Rc<dyn OutputPortBase>> {
        P::Outputs::port(&self.outputs, index).ok_or(PipelineError::IndexOutOfRange {
            direction: PortDirection::Output,
            index,
            arity: P::Outputs::ARITY,
        })
    }

    fn connect(&self, producer: &dyn NodeBase, input: usize, output: usize) -> Result<()> {
        if self.retired.get() || producer.is_retired() {
            return Err(PipelineError::Removed);
        }
        // Only a node that already has consumers can close a cycle.
        if producer.subscriber_id() == self.id
            || (self.observable.observer_count() > 0 && is_dependent_on(self, producer))
        {
            return Err(PipelineError::CyclicDependency);
        }
        let port = self.input(input)?;
        let source = producer.output_port(output)?;

        let previous = port.connected_port();
        port.connect(Some(source))?;
        if let Err(err) = self.sync_subscriptions() {
            port.connect(previous)?;
            self.sync_subscriptions()?;
            return Err(err);
        }

        debug!(
            consumer = self.id.raw(),
            producer = producer.subscriber_id().raw(),
            input,
            output,
            "connected"
        );
        self.invalidate();
        Ok(())
    }

    fn disconnect(&self, input: usize) -> Result<()> {
        self.input(input)?.connect(None)?;
        self.sync_subscriptions()?;

        debug!(consumer = self.id.raw(), input, "disconnected");
        self.invalidate();
        Ok(())
    }

    fn observable(&self) -> &Rc<Observable> {
        &self.observable
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl<P: Process> Observer for Node<P> {
    fn target_changed(&self) -> Option<Rc<Observable>> {
        self.mark_invalid().then(|| self.observable.clone())
    }

    fn target_deleted(&self) {
        let mut pruned = 0;
        for port in P::Inputs::ports(&self.inputs) {
            if port.prune() {
                pruned += 1;
            }
        }
        trace!(node = self.id.raw(), pruned, "producer deleted");
        self.release_stale_subscriptions(&self.input_nodes());
        self.invalidate();
    }
}

impl<P: Process> Drop for Node<P> {
    fn drop(&mut self) {
        trace!(node = self.id.raw(), "dropping node");
        self.observable.notify_deleted();
    }
}

impl<P: Process> fmt::Debug for Node<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("process", &type_name::<P>())
            .field("valid", &self.valid.get())
            .field("connected", &self.is_connected())
            .finish()
    }
}

//! Node Registry
//!
//! The registry owns nodes in an arena of slots and hands out [`NodeId`]
//! handles to them. It is also where graphs are executed.
//!
//! # Handles
//!
//! Freed slots are reused, most recently freed first. Every slot carries a
//! generation that is bumped when its node is removed, and each handle
//! records the generation it was issued under. A handle kept across a
//! `remove` therefore fails with [`PipelineError::StaleHandle`] instead of
//! resolving to whatever node took the slot next.
//!
//! # Execution
//!
//! [`NodeRegistry::execute`] evaluates a node after everything it depends
//! on. Nodes that are still Valid are skipped together with their whole
//! upstream, so executing an unchanged graph again does almost no work.

use std::any::type_name;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::algorithms::execute_node;
use super::node::{Node, NodeBase, Process};
use crate::error::{PipelineError, Result};

/// Handle to a node held by a [`NodeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    /// Slot index of the handle.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Generation of the slot when the handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

/// Typed, non-owning reference to a registered node.
///
/// Returned by [`NodeRegistry::register`] for direct access to the concrete
/// node. It does not keep the node alive.
pub struct NodeRef<P: Process> {
    id: NodeId,
    node: Weak<Node<P>>,
}

impl<P: Process> NodeRef<P> {
    /// The registry handle of the node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node, unless it has been removed.
    pub fn get(&self) -> Result<Rc<Node<P>>> {
        self.node
            .upgrade()
            .filter(|node| !node.is_retired())
            .ok_or(PipelineError::StaleHandle(self.id))
    }
}

impl<P: Process> Clone for NodeRef<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            node: self.node.clone(),
        }
    }
}

impl<P: Process> fmt::Debug for NodeRef<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("process", &type_name::<P>())
            .finish()
    }
}

struct Slot {
    generation: u32,
    node: Option<Rc<dyn NodeBase>>,
}

/// Arena owning every registered node.
#[derive(Default)]
pub struct NodeRegistry {
    slots: Vec<Slot>,
    /// Freed slot indices, reused last-in first-out.
    free: Vec<usize>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Take ownership of a new node running `process`.
    pub fn register<P: Process>(&mut self, process: P) -> (NodeRef<P>, NodeId) {
        let node = Node::new(process);
        let weak = Rc::downgrade(&node);
        let node: Rc<dyn NodeBase> = node;

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };

        debug!(node = %id, process = type_name::<P>(), "registered node");
        (NodeRef { id, node: weak }, id)
    }

    fn slot(&self, id: NodeId) -> Result<&Rc<dyn NodeBase>> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(PipelineError::StaleHandle(id))
    }

    /// The node behind `id`.
    pub fn get(&self, id: NodeId) -> Result<Rc<dyn NodeBase>> {
        self.slot(id).cloned()
    }

    /// The node behind `id`, as its concrete type.
    ///
    /// Fails with [`PipelineError::NodeTypeMismatch`] if the node runs a
    /// process other than `P`.
    pub fn get_as<P: Process>(&self, id: NodeId) -> Result<Rc<Node<P>>> {
        self.get(id)?
            .into_any()
            .downcast::<Node<P>>()
            .map_err(|_| PipelineError::NodeTypeMismatch {
                expected: type_name::<P>(),
            })
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_ok()
    }

    /// Retire the node behind `id` and free its slot.
    ///
    /// Consumers of the node are disconnected and invalidated before this
    /// returns. Strong handles the caller still holds keep the node's memory
    /// alive, but the node is out of the graph.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        self.slot(id)?;
        let slot = &mut self.slots[id.index];
        let node = slot.node.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        debug!(node = %id, "removing node");
        if let Some(node) = node {
            node.retire();
        }
        Ok(())
    }

    /// Feed input `input` of `consumer` from output `output` of `producer`.
    pub fn connect(
        &self,
        consumer: NodeId,
        producer: NodeId,
        input: usize,
        output: usize,
    ) -> Result<()> {
        let producer = self.slot(producer)?;
        self.slot(consumer)?.connect(&**producer, input, output)
    }

    /// Unbind input `input` of `consumer`.
    pub fn disconnect(&self, consumer: NodeId, input: usize) -> Result<()> {
        self.slot(consumer)?.disconnect(input)
    }

    /// Evaluate the node behind `id` after everything it depends on.
    ///
    /// Returns the number of nodes that were recomputed.
    pub fn execute(&self, id: NodeId) -> Result<usize> {
        let root = self.get(id)?;
        debug!(node = %id, "executing");
        execute_node(root)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether the registry holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of every live node, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.node.is_some())
            .map(|(index, slot)| NodeId {
                index,
                generation: slot.generation,
            })
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("len", &self.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Constant, InputRefs};

    struct Negate;

    impl Process for Negate {
        type Inputs = (i32,);
        type Outputs = (i32,);

        fn process(&self, (value,): InputRefs<'_, Self>) -> Self::Outputs {
            (-value,)
        }
    }

    #[test]
    fn register_and_remove_nodes() {
        let mut registry = NodeRegistry::new();

        let (_, id1) = registry.register(Constant::new(1));
        let (_, id2) = registry.register(Negate);
        assert_eq!(registry.len(), 2);

        registry.remove(id1).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(id1));
        assert!(registry.contains(id2));
        assert_eq!(registry.remove(id1), Err(PipelineError::StaleHandle(id1)));
    }

    #[test]
    fn freed_slots_are_reused_with_new_generation() {
        let mut registry = NodeRegistry::new();
        let (_, a) = registry.register(Constant::new(1));
        let (_, b) = registry.register(Constant::new(2));
        registry.remove(a).unwrap();
        registry.remove(b).unwrap();

        // last freed, first reused
        let (_, c) = registry.register(Constant::new(3));
        assert_eq!(c.index(), b.index());
        assert_ne!(c.generation(), b.generation());

        assert!(matches!(registry.get(b), Err(PipelineError::StaleHandle(_))));
        assert_eq!(*registry.get_as::<Constant<i32>>(c).unwrap().inner().value(), 3);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![c]);
    }

    #[test]
    fn typed_lookup_checks_process_type() {
        let mut registry = NodeRegistry::new();
        let (_, id) = registry.register(Negate);

        assert!(registry.get_as::<Negate>(id).is_ok());
        assert!(matches!(
            registry.get_as::<Constant<i32>>(id),
            Err(PipelineError::NodeTypeMismatch { .. })
        ));
    }

    #[test]
    fn node_ref_goes_stale_on_remove() {
        let mut registry = NodeRegistry::new();
        let (node, id) = registry.register(Constant::new(1));
        assert_eq!(node.id(), id);
        assert!(node.get().is_ok());

        registry.remove(id).unwrap();
        assert!(matches!(node.get(), Err(PipelineError::StaleHandle(_))));
    }

    #[test]
    fn connect_and_execute_by_handle() {
        let mut registry = NodeRegistry::with_capacity(2);
        let (_, source) = registry.register(Constant::new(9));
        let (negate, sink) = registry.register(Negate);

        registry.connect(sink, source, 0, 0).unwrap();
        assert_eq!(registry.execute(sink).unwrap(), 2);
        assert_eq!(*negate.get().unwrap().outputs().0.get_data().unwrap(), -9);
        assert_eq!(registry.execute(sink).unwrap(), 0);

        registry.disconnect(sink, 0).unwrap();
        assert_eq!(registry.execute(sink), Err(PipelineError::NotReady));
    }

    #[test]
    fn removing_a_producer_disconnects_consumer() {
        let mut registry = NodeRegistry::new();
        let (_, source) = registry.register(Constant::new(9));
        let (negate, sink) = registry.register(Negate);
        registry.connect(sink, source, 0, 0).unwrap();
        registry.execute(sink).unwrap();

        registry.remove(source).unwrap();
        let negate = negate.get().unwrap();
        assert!(!negate.is_connected());
        assert!(!negate.is_valid());
        assert_eq!(registry.connect(sink, source, 0, 0), Err(PipelineError::StaleHandle(source)));
    }

    #[test]
    fn remove_disconnects_consumers_while_a_handle_is_held() {
        let mut registry = NodeRegistry::new();
        let (source_ref, source) = registry.register(Constant::new(7));
        let (negate, sink) = registry.register(Negate);
        registry.connect(sink, source, 0, 0).unwrap();
        registry.execute(sink).unwrap();

        let held = source_ref.get().unwrap();
        registry.remove(source).unwrap();

        let negate = negate.get().unwrap();
        assert!(!registry.contains(source));
        assert!(!negate.is_connected());
        assert!(!negate.is_valid());
        assert!(matches!(source_ref.get(), Err(PipelineError::StaleHandle(_))));
        assert_eq!(held.observable().observer_count(), 0);

        held.update(|constant| constant.set_value(8));
        assert_eq!(registry.execute(sink), Err(PipelineError::NotReady));
        assert_eq!(held.evaluate(), Err(PipelineError::Removed));
        assert_eq!(negate.connect(&*held, 0, 0), Err(PipelineError::Removed));
    }
}

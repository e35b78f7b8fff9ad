//! Dataflow Graph
//!
//! This module implements the processing graph: typed nodes wired output to
//! input, the dependency traversals over them, and the registry that owns
//! nodes and executes them.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes run a [`Process`] over their current inputs and cache the result
//!   in their output ports
//! - Edges point from a consumer to the producer it reads from
//!
//! When a producer changes, is disconnected, or is dropped, every node
//! downstream of it is invalidated immediately. Executing a node then
//! re-evaluates exactly the invalid part of its upstream, producers before
//! consumers.
//!
//! # Design Decisions
//!
//! 1. Nodes refer to each other through `Weak` handles and change
//!    notifications, never through owning pointers, so dropping a node in
//!    any order is safe.
//!
//! 2. Cycles are rejected when an edge is added rather than detected during
//!    execution.
//!
//! 3. The registry hands out generational handles, so a handle to a removed
//!    node cannot silently resolve to a newer one.

mod algorithms;
mod constant;
mod node;
mod registry;

pub use algorithms::{connect, evaluation_order, execute_node, is_dependent_on};
pub use constant::Constant;
pub use node::{InputRefs, Node, NodeBase, Process};
pub use registry::{NodeId, NodeRef, NodeRegistry};

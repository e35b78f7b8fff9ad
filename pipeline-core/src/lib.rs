//! Pipeline Core
//!
//! This crate provides an in-process engine for typed dataflow graphs.
//! It implements:
//!
//! - Typed ports, checked when they are connected
//! - Change notification between nodes, safe in any destruction order
//! - Cached evaluation that never serves stale outputs
//! - Cycle prevention and dependency-ordered execution
//! - A node registry with generational handles
//!
//! Execution is single-threaded and synchronous.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `notify`: the observer protocol that drives invalidation
//! - `port`: typed input and output ports
//! - `graph`: nodes, dependency algorithms and the registry
//! - `error`: the error type shared by all of the above
//!
//! # Example
//!
//! ```rust
//! use pipeline_core::{Constant, InputRefs, NodeRegistry, Process};
//!
//! struct Add;
//!
//! impl Process for Add {
//!     type Inputs = (i32, i32);
//!     type Outputs = (i32,);
//!
//!     fn process(&self, (a, b): InputRefs<'_, Self>) -> Self::Outputs {
//!         (a + b,)
//!     }
//! }
//!
//! let mut registry = NodeRegistry::new();
//! let (_, a) = registry.register(Constant::new(150));
//! let (_, b) = registry.register(Constant::new(-54));
//! let (add, sum) = registry.register(Add);
//!
//! registry.connect(sum, a, 0, 0)?;
//! registry.connect(sum, b, 1, 0)?;
//! registry.execute(sum)?;
//!
//! assert_eq!(*add.get()?.outputs().0.get_data()?, 96);
//! # Ok::<(), pipeline_core::PipelineError>(())
//! ```

pub mod error;
pub mod graph;
pub mod notify;
pub mod port;

pub use error::{PipelineError, PortDirection, Result};
pub use graph::{
    connect, evaluation_order, execute_node, is_dependent_on, Constant, InputRefs, Node,
    NodeBase, NodeId, NodeRef, NodeRegistry, Process,
};
pub use notify::{Observable, Observer, SubscriberId, Subscription};
pub use port::{InputPort, InputPortBase, InputSet, OutputPort, OutputPortBase, OutputSet};

//! Typed Ports
//!
//! Ports are the typed connection points between nodes.
//!
//! - An [`OutputPort<T>`] owns at most one computed value of type `T` and
//!   knows which node it belongs to.
//! - An [`InputPort<T>`] refers, without owning it, to at most one output
//!   port of the same value type.
//!
//! Nodes talk to their ports through the type-erased [`OutputPortBase`] and
//! [`InputPortBase`] traits, so that a connection can be requested between
//! any two nodes and checked at connect time. A value-type mismatch fails
//! with [`PipelineError::TypeMismatch`](crate::PipelineError::TypeMismatch).
//!
//! The fixed, heterogeneous port lists of a node are described by the
//! [`InputSet`] and [`OutputSet`] traits, implemented for tuples of value
//! types.

mod input;
mod output;
mod set;

pub use input::{InputPort, InputPortBase, PlaceholderInput};
pub use output::{OutputPort, OutputPortBase};
pub use set::{InputSet, OutputSet};

//! Error types for pipeline construction and evaluation.

use std::fmt;

use crate::graph::NodeId;

/// Which side of a node a port lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    /// An input port, fed by another node's output.
    Input,
    /// An output port, holding the node's computed value.
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// Errors raised by the graph engine.
///
/// All of these describe misuse by the caller. Nothing is retried
/// internally, and a failed operation leaves the graph as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// An input port was connected to an output of a different value type.
    #[error("cannot connect input of type `{expected}` to output of type `{found}`")]
    TypeMismatch {
        /// Value type the input port accepts.
        expected: &'static str,
        /// Value type the output port holds.
        found: &'static str,
    },

    /// An input port was queried while it has no source.
    #[error("input is not connected")]
    NotConnected,

    /// A port was read before its value was computed.
    #[error("data is not available on the port")]
    DataUnavailable,

    /// The requested connection would close a cycle.
    #[error("connection would create a cyclic dependency")]
    CyclicDependency,

    /// A port index beyond the node's declared arity.
    #[error("{direction} index {index} is out of range (arity {arity})")]
    IndexOutOfRange {
        /// Side of the node that was indexed.
        direction: PortDirection,
        /// Requested index.
        index: usize,
        /// Number of ports on that side.
        arity: usize,
    },

    /// A node was evaluated while some input had no data.
    #[error("cannot evaluate, there is no data on every input")]
    NotReady,

    /// An observer that no longer exists was attached.
    #[error("cannot attach an absent observer")]
    InvalidSubscription,

    /// A registry handle whose node has been removed.
    #[error("{0} does not refer to a live node")]
    StaleHandle(NodeId),

    /// A node that was removed from its registry was used through a handle
    /// still held to it.
    #[error("node has been removed from the graph")]
    Removed,

    /// A typed lookup found a node of a different process type.
    #[error("node is not a `{expected}`")]
    NodeTypeMismatch {
        /// Process type that was requested.
        expected: &'static str,
    },
}

/// Result alias used throughout the crate.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

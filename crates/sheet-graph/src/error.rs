//! Error types for graph mutation

use crate::ids::{ConnectionId, NodeId};
use crate::model::{NodeKind, PortSide};

/// Rejected graph operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Unknown node id
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Unknown connection id
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// Node id already present
    #[error("node already exists: {0}")]
    NodeExists(NodeId),

    /// Input/output label already used by a node of the same kind
    #[error("duplicate {kind} label: \"{label}\"")]
    DuplicateLabel {
        /// Kind whose labels collide
        kind: NodeKind,
        /// Colliding label
        label: String,
    },

    /// Port missing on node
    #[error("{side:?} port \"{port}\" not found on node {node}")]
    PortNotFound {
        /// Node id
        node: NodeId,
        /// Side searched
        side: PortSide,
        /// Port name
        port: String,
    },

    /// Sockets or node kinds cannot be connected
    #[error("incompatible connection: {0}")]
    Incompatible(String),

    /// Source and target are the same node
    #[error("cannot connect node {0} to itself")]
    SelfLoop(NodeId),
}

impl GraphError {
    /// Whether the error is a structural-invariant violation
    #[inline]
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::DuplicateLabel { .. })
    }
}

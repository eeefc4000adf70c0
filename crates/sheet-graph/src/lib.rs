//! Sheet Graph
//!
//! In-memory model of a computation sheet and the structural operations
//! that keep it valid.
//!
//! # Core Concepts
//!
//! - [`Graph`]: nodes and connections, with read-only queries
//! - [`Node`] / [`Port`] / [`Connection`]: the data model
//! - Mutation operations on [`Graph`]: add, remove, update, duplicate, connect
//! - Socket sync: reconcile a node's ports with a requested list, pruning
//!   connections bound to ports that disappear
//! - [`EventBus`]: change notification for subscribers
//!
//! # Example
//!
//! ```rust
//! use sheet_graph::{Graph, NewNode, NodeKind};
//!
//! let mut graph = Graph::new();
//! let a = graph.add_node(NewNode::new(NodeKind::Input, "X"));
//! let b = graph.add_node(NewNode::new(NodeKind::Input, "X"));
//! assert_eq!(graph.node(b).unwrap().label, "X (1)");
//!
//! let out = graph.add_node(NewNode::new(NodeKind::Output, "Y"));
//! graph.connect(a, "value", out, "value").unwrap();
//! graph.remove_node(a).unwrap();
//! assert_eq!(graph.connection_count(), 0);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod events;
pub mod graph;
pub mod ids;
pub mod model;
pub mod mutation;
pub mod sockets;

pub use error::GraphError;
pub use events::{EventBus, GraphEvent};
pub use graph::{Graph, IntegrityIssue};
pub use ids::{ConnectionId, FolderId, NodeId, SheetId, VersionId};
pub use model::{
    CalculationResult, Connection, ControlMode, Node, NodeKind, NodeResult, Port, PortSide,
    Ports, Position, Sheet, SocketKind,
};
pub use mutation::{is_default_label, Connected, NewNode, NodePatch, NodeUpdate, RemovedNode};
pub use sockets::{check_compatible, sheet_socket};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with sheet graphs
    pub use crate::{
        Connection, Graph, GraphError, GraphEvent, NewNode, Node, NodeId, NodeKind, NodePatch,
        Port, PortSide, Position, Sheet, SheetId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Sheet History
//!
//! Undo/redo over inverse pairs of graph mutations.
//!
//! # Core Concepts
//!
//! - [`HistoryAction`]: labelled `undo`/`redo` closure pair
//! - [`History`]: LIFO undo stack plus redo stack with branch discard
//! - [`graph_actions`]: constructors building the inverse pair for each
//!   mutation outcome returned by [`sheet_graph::Graph`]
//!
//! # Example
//!
//! ```rust
//! use sheet_graph::{Graph, NewNode, NodeKind};
//! use sheet_history::{graph_actions, History};
//!
//! let mut graph = Graph::new();
//! let mut history = History::new(50);
//!
//! let id = graph.add_node(NewNode::new(NodeKind::Input, "rate"));
//! let node = graph.node(id).unwrap().clone();
//! history.record(graph_actions::node_added("Add node", node, 0));
//!
//! history.undo(&mut graph).unwrap();
//! assert!(graph.node(id).is_none());
//! history.redo(&mut graph).unwrap();
//! assert!(graph.node(id).is_some());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod graph_actions;
mod history;

pub use error::HistoryError;
pub use graph_actions::GraphAction;
pub use history::{ActionFn, History, HistoryAction};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Sheet Nested
//!
//! Keeps sheet-reference nodes in step with the sheets they call.
//!
//! # Core Concepts
//!
//! - [`SheetSource`]: where referenced sheets are fetched from
//! - [`ExpectedPorts`]: the calling signature of a referenced sheet
//! - [`Resolver`]: reconciles every reference in a graph and resolves the
//!   values flowing into a reference, across nesting levels
//!
//! A reference whose ports drifted from its target is repaired through socket
//! sync. Pruned connections always surface a warning on the
//! [`ReconcileReport`].
//!
//! # Example
//!
//! ```rust
//! use sheet_graph::{Graph, NewNode, NodeKind};
//! use sheet_nested::ExpectedPorts;
//!
//! let mut callee = Graph::new();
//! callee.add_node(NewNode::new(NodeKind::Input, "rate"));
//! callee.add_node(NewNode::new(NodeKind::Output, "total"));
//!
//! let expected = ExpectedPorts::of(&callee);
//! assert_eq!(expected.input_names().collect::<Vec<_>>(), vec!["rate"]);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod ports;
pub mod resolver;
pub mod values;

pub use error::ResolveError;
pub use ports::{apply_expected, ExpectedPorts};
pub use resolver::{ReconcilePlan, ReconcileReport, Resolver, SheetSource};
pub use values::{resolve_inputs, ResolvedInput, ValueSource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

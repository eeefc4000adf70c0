//! Sheet Calc
//!
//! Calculation traffic between the editor and the remote evaluator.
//!
//! # Core Concepts
//!
//! - [`Evaluator`]: remote calculate, preview and sweep endpoints
//! - [`Debouncer`]: last-scheduled-wins delay; superseded work is aborted
//! - [`PreviewPipeline`]: debounced previews of the unsaved graph, explicit
//!   calculation and sweeps, all annotating the shared graph the same way
//! - [`ShareStatePublisher`]: pending inputs reflected into a share query
//!
//! Annotation sets or clears each node's error from its result entry and
//! refreshes output values. Input values are never overwritten.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use sheet_calc::{apply_results, PreviewRequest, PendingInputs};
//! use sheet_graph::{CalculationResult, Graph, NewNode, NodeKind};
//!
//! let mut graph = Graph::new();
//! let rate = graph.add_node(NewNode::new(NodeKind::Input, "rate"));
//!
//! let request = PreviewRequest::build(&graph, &PendingInputs::from([(rate, json!(2))]));
//! assert_eq!(request.inputs["rate"].value, json!(2));
//!
//! let annotation = apply_results(&mut graph, &CalculationResult::default());
//! assert!(annotation.first_error.is_none());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod annotate;
pub mod debounce;
pub mod error;
pub mod evaluator;
pub mod preview;
pub mod share;

pub use annotate::{apply_results, Annotation};
pub use debounce::Debouncer;
pub use error::CalcError;
pub use evaluator::{
    calculation_inputs, labeled_overrides, Evaluator, InputValue, LabeledInputs, PendingInputs,
    PreviewRequest, SweepRequest, SweepResponse, SweepValues,
};
pub use preview::{PreviewPipeline, SharedGraph, DEFAULT_PREVIEW_DELAY};
pub use share::{parse_share_query, share_query, ShareStatePublisher, DEFAULT_SHARE_DELAY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

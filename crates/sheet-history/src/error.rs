//! Error types for history replay

use sheet_graph::GraphError;

/// Undo or redo could not be applied
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// The inverse mutation was rejected by the graph
    #[error("graph rejected history step: {0}")]
    Graph(#[from] GraphError),

    /// Other failure reported by an action
    #[error("history step failed: {0}")]
    Failed(String),
}

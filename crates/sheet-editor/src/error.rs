//! Error types for the editing session

use sheet_calc::CalcError;
use sheet_client::ClientError;
use sheet_graph::GraphError;
use sheet_history::HistoryError;
use sheet_lease::LeaseError;
use sheet_nested::ResolveError;
use sheet_sweep::SweepError;

/// Editing session error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    /// Mutation attempted without holding the lease
    #[error("sheet is read-only{}", locked_by(.holder.as_deref()))]
    ReadOnly {
        /// Current lease holder, when known
        holder: Option<String>,
    },

    /// Operation must be confirmed by the user first
    #[error("confirmation required: {0}")]
    NeedsConfirmation(String),

    /// Proposed value for a node that is not an input
    #[error("node {0} is not an input")]
    NotAnInput(sheet_graph::NodeId),

    /// Graph rejected the mutation
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Undo or redo failed
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Referenced sheet could not be resolved
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Lease server failure
    #[error(transparent)]
    Lease(#[from] LeaseError),

    /// Calculation failure
    #[error(transparent)]
    Calc(#[from] CalcError),

    /// Sweep visualization failure
    #[error(transparent)]
    Sweep(#[from] SweepError),

    /// Loading or saving failed
    #[error("sheet store error: {0}")]
    Store(#[from] ClientError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

fn locked_by(holder: Option<&str>) -> String {
    holder.map(|h| format!(" (locked by {h})")).unwrap_or_default()
}

impl EditorError {
    /// Whether the user can resolve this by taking over the lease
    #[inline]
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly { .. })
    }

    /// Node to highlight, when the evaluator named one
    #[must_use]
    pub fn node(&self) -> Option<sheet_graph::NodeId> {
        match self {
            Self::Calc(e) => e.node(),
            _ => None,
        }
    }
}

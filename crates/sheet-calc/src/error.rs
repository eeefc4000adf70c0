//! Calculation errors

use sheet_graph::{GraphError, NodeId};

/// Calculation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalcError {
    /// Evaluator rejected the sheet
    #[error("calculation failed: {message}")]
    Evaluation {
        /// Evaluator message
        message: String,
        /// Node to highlight, when the evaluator named one
        node: Option<NodeId>,
    },

    /// Evaluator could not be reached or answered with a server error
    #[error("evaluator request failed: {0}")]
    Transport(String),

    /// Sweep parameters are unusable
    #[error("invalid sweep: {0}")]
    InvalidSweep(String),

    /// Evaluator reported a sweep failure
    #[error("sweep failed: {0}")]
    Sweep(String),

    /// Graph rejected an annotation
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl CalcError {
    /// Evaluation error without a node
    #[must_use]
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
            node: None,
        }
    }

    /// Node the error points at
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Evaluation { node, .. } => *node,
            _ => None,
        }
    }

    /// Whether retrying the same request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

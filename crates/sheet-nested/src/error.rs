//! Error types for nested sheet resolution

use sheet_graph::{GraphError, NodeId, SheetId};

/// Resolution failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Referenced sheet could not be fetched
    #[error("failed to fetch sheet {sheet}: {message}")]
    Fetch {
        /// Sheet requested
        sheet: SheetId,
        /// Transport or server message
        message: String,
    },

    /// Node is not a sheet reference
    #[error("node {0} is not a sheet reference")]
    NotAReference(NodeId),

    /// Sheet reference without a target
    #[error("sheet reference {0} has no target sheet")]
    NoTarget(NodeId),

    /// Reference path revisits a sheet
    #[error("sheet {0} references itself")]
    Cycle(SheetId),

    /// Graph rejected the port update
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ResolveError {
    /// Build a fetch error from any displayable cause
    #[must_use]
    pub fn fetch(sheet: SheetId, cause: impl std::fmt::Display) -> Self {
        Self::Fetch {
            sheet,
            message: cause.to_string(),
        }
    }
}

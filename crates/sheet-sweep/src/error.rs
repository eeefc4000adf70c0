//! Sweep planning errors

/// Sweep planning failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SweepError {
    /// No registered strategy handles this column shape
    #[error("no chart strategy for output '{output}' ({shape})")]
    NoStrategy {
        /// Output column name
        output: String,
        /// Column shape description
        shape: String,
    },

    /// Row width does not match the declared columns
    #[error("row {row} has {found} {what} values, expected {expected}")]
    RowWidth {
        /// Row index
        row: usize,
        /// `axis` or `output`
        what: &'static str,
        /// Declared column count
        expected: usize,
        /// Values present
        found: usize,
    },

    /// Evaluator reported a sweep failure
    #[error("sweep failed: {0}")]
    Failed(String),
}

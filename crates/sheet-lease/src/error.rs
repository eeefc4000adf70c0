//! Lease errors

/// Lease request failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaseError {
    /// Another session holds the lease
    #[error("Locked by {holder}")]
    Locked {
        /// Identity of the holder
        holder: String,
    },

    /// Request did not reach the lease server or it answered with an error
    #[error("lease request failed: {0}")]
    Transport(String),

    /// Operation requires holding the lease
    #[error("lease is not held by this session")]
    NotHeld,
}

impl LeaseError {
    /// Whether this is a conflict with another holder
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    /// Parse a server conflict message of the form `Locked by <holder>`
    ///
    /// Anything else becomes a transport error carrying the message.
    #[must_use]
    pub fn from_conflict_message(message: &str) -> Self {
        match message.trim().strip_prefix("Locked by ") {
            Some(holder) if !holder.trim().is_empty() => Self::Locked {
                holder: holder.trim().to_string(),
            },
            _ => Self::Transport(message.to_string()),
        }
    }
}

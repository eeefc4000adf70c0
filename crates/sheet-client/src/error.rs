//! HTTP client errors and their mapping onto the domain errors

use sheet_calc::CalcError;
use sheet_graph::SheetId;
use sheet_lease::LeaseError;
use sheet_nested::ResolveError;

/// HTTP request failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// Status code
        status: u16,
        /// Error message extracted from the body
        message: String,
    },

    /// Request could not be sent or the connection failed
    #[error("request failed: {0}")]
    Transport(String),

    /// Response body did not have the expected shape
    #[error("invalid response: {0}")]
    Decode(String),

    /// Base URL or path could not be built
    #[error("invalid url: {0}")]
    Url(String),
}

impl ClientError {
    /// Whether the same request may succeed later
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) | Self::Url(_) => false,
        }
    }

    /// Whether the server reported a conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Status { status: 409, .. })
    }

    /// Status code, for status errors
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        Self::Url(e.to_string())
    }
}

impl From<ClientError> for LeaseError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Status {
                status: 409,
                message,
            } => LeaseError::from_conflict_message(&message),
            other => LeaseError::Transport(other.to_string()),
        }
    }
}

impl From<ClientError> for CalcError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Status { status, message } if status < 500 => {
                CalcError::evaluation(message)
            }
            other => CalcError::Transport(other.to_string()),
        }
    }
}

/// Map a fetch failure of `sheet`
#[must_use]
pub fn fetch_error(sheet: SheetId, e: &ClientError) -> ResolveError {
    ResolveError::fetch(sheet, e)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, message: &str) -> ClientError {
        ClientError::Status {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn retry_only_transient_failures() {
        assert!(ClientError::Transport("reset".into()).is_retryable());
        assert!(status(503, "down").is_retryable());
        assert!(status(429, "slow down").is_retryable());
        assert!(!status(400, "bad").is_retryable());
        assert!(!status(409, "Locked by bob").is_retryable());
        assert!(!ClientError::Decode("eof".into()).is_retryable());
    }

    #[test]
    fn conflict_becomes_lock_error() {
        assert_eq!(
            LeaseError::from(status(409, "Locked by bob")),
            LeaseError::Locked {
                holder: "bob".to_string()
            }
        );
        assert!(matches!(
            LeaseError::from(status(500, "boom")),
            LeaseError::Transport(_)
        ));
    }

    #[test]
    fn client_errors_become_calc_errors() {
        assert_eq!(
            CalcError::from(status(422, "cycle detected")),
            CalcError::evaluation("cycle detected")
        );
        assert!(CalcError::from(status(502, "bad gateway")).is_retryable());
    }
}

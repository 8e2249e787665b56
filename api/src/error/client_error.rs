//! HTTP client and network errors.

use thiserror::Error;

/// Errors from the transport layer.
///
/// These errors represent network-level failures and cancellation; they
/// are propagated unchanged to the caller.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed due to network or protocol error.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Request exceeded the configured timeout.
    #[error("Request timeout after {duration_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        duration_ms: u64,
    },

    /// Failed to establish connection to the server.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The call was cancelled through its cancel token.
    #[error("Request cancelled")]
    Cancelled,
}

impl ClientError {
    /// Converts a `reqwest` error, surfacing timeouts as [`ClientError::Timeout`].
    pub(crate) fn from_reqwest(error: reqwest::Error, timeout_ms: u64) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                duration_ms: timeout_ms,
            }
        } else if error.is_connect() {
            Self::Connection(error.to_string())
        } else {
            Self::Request(error)
        }
    }

    /// Returns `true` if this error is retryable.
    ///
    /// Timeout and connection errors are typically retryable; cancellation
    /// never is.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connection(_) => true,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Cancelled => false,
        }
    }

    /// Returns the HTTP status code carried by the underlying error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_retryable() {
        let err = ClientError::Timeout { duration_ms: 5000 };
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Request timeout after 5000ms");
    }

    #[test]
    fn test_connection_is_retryable() {
        let err = ClientError::Connection("connection refused".to_string());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_cancelled_not_retryable() {
        assert!(!ClientError::Cancelled.is_retryable());
        assert_eq!(ClientError::Cancelled.status_code(), None);
    }
}

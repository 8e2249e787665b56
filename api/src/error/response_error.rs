//! Response status and decoding errors.

use serde_json::Value;
use thiserror::Error;

/// Errors produced after a response arrived.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The server answered with a non-success status other than 429.
    #[error("HTTP {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The decoded error body, or the raw text as a JSON string.
        body: Value,
    },

    /// Every attempt was answered with 429.
    #[error("Rate limited after {attempts} attempt(s): {body}")]
    RateLimited {
        /// How many attempts were made.
        attempts: u32,
        /// Body of the last 429 response.
        body: Value,
    },

    /// A single-document response was not valid JSON.
    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Reading a streaming response failed part way.
    #[error("Response stream failed: {source}")]
    Stream {
        /// The underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ResponseError {
    /// Wraps a stream read error.
    pub fn stream(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Stream {
            source: source.into(),
        }
    }

    /// Returns the HTTP status code, if the error came from a status line.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Returns the server's error body, if one was captured.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } | Self::RateLimited { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns `true` for 5xx statuses.
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_some_and(|s| s >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_extraction() {
        let err = ResponseError::Status {
            status: 404,
            body: json!({ "message": "not found" }),
        };
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.body(), Some(&json!({ "message": "not found" })));
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_server_error() {
        let err = ResponseError::Status {
            status: 503,
            body: json!("unavailable"),
        };
        assert!(err.is_server_error());
        assert_eq!(err.to_string(), "HTTP 503: \"unavailable\"");
    }

    #[test]
    fn test_stream_error_has_no_status() {
        let err = ResponseError::stream(std::io::Error::other("reset"));
        assert_eq!(err.status_code(), None);
        assert!(err.to_string().contains("reset"));
    }
}

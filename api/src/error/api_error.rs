//! Top-level API error type.

use super::{ClientError, ConfigError, RequestError, ResponseError};
use thiserror::Error;

/// Top-level error type for every runtime operation.
///
/// ## Examples
///
/// ```rust,ignore
/// use api_runtime::error::ApiError;
///
/// fn handle_error(err: ApiError) {
///     match err {
///         ApiError::Config(e) => eprintln!("Bad contract or client setup: {e}"),
///         ApiError::Request(e) => eprintln!("Rejected input: {e}"),
///         ApiError::Response(e) => eprintln!("Server said no: {e}"),
///         ApiError::Client(e) => eprintln!("Network error: {e}"),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum ApiError {
    /// Contract or client configuration errors.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Caller input rejected before sending.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Non-success or undecodable responses.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Transport errors (network, timeout, cancellation).
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ApiError {
    /// Returns `true` if the call was cancelled through its token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Client(ClientError::Cancelled))
    }

    /// Returns the HTTP status of the failing response, if there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Response(e) => e.status_code(),
            Self::Client(e) => e.status_code(),
            _ => None,
        }
    }
}

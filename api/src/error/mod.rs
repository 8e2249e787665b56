//! Layered error types for the runtime.
//!
//! The hierarchy follows the stage at which a call can fail:
//! - [`ApiError`] - Top-level error returned by [`ApiClient::run`](crate::ApiClient::run)
//! - [`ConfigError`] - Contract and client configuration errors
//! - [`RequestError`] - Caller input rejected before any network I/O
//! - [`ResponseError`] - Non-success statuses and undecodable responses
//! - [`ClientError`] - Transport failures and cancellation
//!
//! [`MappingError`] and [`SerializeError`] are the leaf errors of the
//! mapper and serializer; the client wraps them in [`RequestError`].

mod api_error;
mod client_error;
mod config_error;
mod mapping_error;
mod request_error;
mod response_error;
mod serialize_error;

pub use api_error::ApiError;
pub use client_error::ClientError;
pub use config_error::ConfigError;
pub use mapping_error::MappingError;
pub use request_error::RequestError;
pub use response_error::ResponseError;
pub use serialize_error::SerializeError;

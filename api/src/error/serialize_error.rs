//! Body serialization errors.

use thiserror::Error;

/// Errors converting a mapped body into its wire encoding.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// JSON encoding failed (for example, a byte stream in a JSON body).
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Form and multipart bodies must be objects at the top level.
    #[error("{content_type} body must be an object, got {found}")]
    NotAnObject {
        /// The content type being produced.
        content_type: String,
        /// Type name of the value that was supplied.
        found: &'static str,
    },

    /// Reading a streamed binary field failed.
    #[error("Failed to read stream for field {field}: {source}")]
    Stream {
        /// The form field name.
        field: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A streamed binary field was already consumed by an earlier call.
    #[error("Stream for field {field} was already consumed")]
    StreamConsumed {
        /// The form field name.
        field: String,
    },
}

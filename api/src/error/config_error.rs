//! Contract and client configuration errors.

use thiserror::Error;

/// Errors in the contract or the client configuration.
///
/// These are raised while the catalog or client is being built, or when a
/// call names something the catalog does not contain. They are never
/// retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No resource with this (normalized) name exists.
    #[error("Unknown resource: {resource}")]
    UnknownResource {
        /// The normalized resource name.
        resource: String,
    },

    /// The resource exists but has no such operation.
    #[error("Unknown operation: {resource}.{operation}")]
    UnknownOperation {
        /// The normalized resource name.
        resource: String,
        /// The normalized operation name.
        operation: String,
    },

    /// Two operations in one resource normalize to the same name.
    #[error("Duplicate operation id {operation} in resource {resource}")]
    DuplicateOperation {
        /// The normalized resource name.
        resource: String,
        /// The normalized operation name.
        operation: String,
    },

    /// An operation object has no `operationId`.
    #[error("Missing operationId for {method} {path}")]
    MissingOperationId {
        /// The HTTP verb.
        method: String,
        /// The path template.
        path: String,
    },

    /// A parameter is declared `in` a location the runtime cannot fill.
    #[error("Unsupported location {location:?} for parameter {parameter} of operation {operation}")]
    UnsupportedParameterLocation {
        /// The normalized operation name.
        operation: String,
        /// The parameter name.
        parameter: String,
        /// The declared location.
        location: String,
    },

    /// A `$ref` points outside the document or at nothing.
    #[error("Unresolvable reference: {reference}")]
    UnresolvableReference {
        /// The `$ref` value.
        reference: String,
    },

    /// A chain of `$ref`s leads back to itself.
    #[error("Cyclic reference: {reference}")]
    CyclicReference {
        /// The `$ref` that closed the cycle.
        reference: String,
    },

    /// Path template contains invalid parameter syntax.
    #[error("Invalid path template: {message}")]
    InvalidPathTemplate {
        /// Description of the path template error.
        message: String,
    },

    /// A document does not have the shape of an OpenAPI document.
    #[error("Invalid document: {message}")]
    InvalidDocument {
        /// What was wrong.
        message: String,
    },

    /// A schema object could not be interpreted.
    #[error("Invalid schema: {message}")]
    InvalidSchema {
        /// What was wrong.
        message: String,
    },

    /// A YAML document failed to parse.
    #[error("Invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A configured header name or value is not valid HTTP.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid path template error.
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPathTemplate {
            message: message.into(),
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Returns `true` if the error comes from a lookup by name at call time
    /// rather than from building the catalog.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::UnknownResource { .. } | Self::UnknownOperation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url() {
        let url_err = url::Url::parse("not-a-url").unwrap_err();
        let err = ConfigError::InvalidUrl(url_err);
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_invalid_path_template() {
        let err = ConfigError::invalid_path("unclosed brace in /users/{id");
        assert!(err.to_string().contains("Invalid path template"));
    }

    #[test]
    fn test_duplicate_operation() {
        let err = ConfigError::DuplicateOperation {
            resource: "advertiser".to_string(),
            operation: "list".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Duplicate operation id list in resource advertiser"
        );
        assert!(!err.is_lookup());
    }

    #[test]
    fn test_lookup_errors() {
        let err = ConfigError::UnknownOperation {
            resource: "advertiser".to_string(),
            operation: "explode".to_string(),
        };
        assert!(err.is_lookup());
        assert_eq!(err.to_string(), "Unknown operation: advertiser.explode");
    }
}

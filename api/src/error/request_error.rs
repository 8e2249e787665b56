//! Errors in caller-supplied request input.

use thiserror::Error;

use super::{MappingError, SerializeError};
use crate::contract::ParameterLocation;
use crate::validate::ValidationFailure;

/// Caller input rejected before any network I/O.
///
/// Every variant names the operation and, where there is one, the
/// offending property in its normalized form.
#[derive(Debug, Error)]
pub enum RequestError {
    /// A required path, query or header parameter was not supplied.
    #[error("Missing required {location} parameter {parameter} for {operation}")]
    MissingParameter {
        /// The qualified operation name (`resource.operation`).
        operation: String,
        /// The normalized parameter name.
        parameter: String,
        /// Where the parameter goes.
        location: ParameterLocation,
    },

    /// A parameter value failed validation.
    #[error("Invalid {location} parameter {parameter} for {operation}: {failure}")]
    InvalidParameter {
        /// The qualified operation name.
        operation: String,
        /// The normalized parameter name.
        parameter: String,
        /// Where the parameter goes.
        location: ParameterLocation,
        /// The validation diagnostics.
        failure: ValidationFailure,
    },

    /// The operation declares a request body but none was supplied.
    #[error("Missing request body for {operation}")]
    MissingBody {
        /// The qualified operation name.
        operation: String,
    },

    /// The request body failed validation.
    #[error("Invalid request body for {operation}: {failure}")]
    InvalidBody {
        /// The qualified operation name.
        operation: String,
        /// The validation diagnostics.
        failure: ValidationFailure,
    },

    /// Mapping the body failed.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Serializing the body failed.
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

impl RequestError {
    /// Returns the validation diagnostics, if this is a validation error.
    pub fn validation_failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::InvalidParameter { failure, .. } | Self::InvalidBody { failure, .. } => {
                Some(failure)
            }
            _ => None,
        }
    }

    /// Returns the normalized property the error is about, if any.
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::MissingParameter { parameter, .. } | Self::InvalidParameter { parameter, .. } => {
                Some(parameter)
            }
            Self::Mapping(e) => Some(e.property()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_display() {
        let err = RequestError::MissingParameter {
            operation: "advertiser.get".to_string(),
            parameter: "id".to_string(),
            location: ParameterLocation::Path,
        };
        assert_eq!(
            err.to_string(),
            "Missing required path parameter id for advertiser.get"
        );
        assert_eq!(err.property(), Some("id"));
        assert!(err.validation_failure().is_none());
    }

    #[test]
    fn test_invalid_body_carries_failure() {
        let err = RequestError::InvalidBody {
            operation: "advertiser.create".to_string(),
            failure: ValidationFailure::new("`title` is not nullable"),
        };
        assert_eq!(
            err.validation_failure().map(|f| f.message.as_str()),
            Some("`title` is not nullable")
        );
        assert!(err.to_string().contains("`title` is not nullable"));
    }
}

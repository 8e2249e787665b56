//! Property mapping errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while mapping a value against its schema.
///
/// Mapping is permissive: type mismatches pass through untouched. The only
/// failure is reading a file that a binary field points at.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A binary field named a file that exists but could not be read.
    #[error("Failed to read {path} for property {property}: {source}")]
    Io {
        /// The normalized property name.
        property: String,
        /// The file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl MappingError {
    /// Returns the normalized name of the property that failed.
    pub fn property(&self) -> &str {
        match self {
            Self::Io { property, .. } => property,
        }
    }
}

//! Non-fatal diagnostics.
//!
//! Unsupported input keys, deprecated properties and stream anomalies are
//! reported here rather than failing the call. The client picks a sink per
//! call; [`TracingSink`] is the default.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

/// A warning produced while mapping a request or decoding a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The caller supplied a key the schema does not declare; it was dropped.
    UnsupportedProperty {
        /// The normalized key.
        property: String,
        /// Dotted path of the enclosing object (`body`, `body.flight`).
        path: String,
    },
    /// The caller supplied a property marked deprecated; it was still sent.
    DeprecatedProperty {
        /// The declared property name.
        property: String,
        /// Dotted path of the enclosing object.
        path: String,
    },
    /// A complete NDJSON line did not parse and was skipped.
    MalformedRecord {
        /// The offending line, lossily decoded.
        line: String,
    },
    /// The stream ended inside a record; the partial record was dropped.
    TruncatedStream {
        /// Number of buffered bytes that were discarded.
        remaining_bytes: usize,
    },
    /// A record grew past the decoder's size limit before its newline
    /// arrived; it was discarded up to the next newline.
    OversizedRecord {
        /// The limit in bytes.
        limit: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedProperty { property, path } => write!(
                f,
                "Property {property} is not supported by this operation ({path}), it will be ignored"
            ),
            Self::DeprecatedProperty { property, path } => {
                write!(f, "Property {property} ({path}) is deprecated")
            }
            Self::MalformedRecord { line } => write!(f, "Skipping malformed record: {line}"),
            Self::TruncatedStream { remaining_bytes } => write!(
                f,
                "Stream ended inside a record, dropping {remaining_bytes} buffered byte(s)"
            ),
            Self::OversizedRecord { limit } => {
                write!(f, "Skipping record larger than {limit} bytes")
            }
        }
    }
}

/// Receiver of [`Diagnostic`]s.
pub trait DiagnosticSink: Send + Sync + fmt::Debug {
    /// Records one diagnostic.
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` at `WARN` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        warn!(diagnostic = ?diagnostic, "{diagnostic}");
    }
}

/// Keeps every diagnostic in memory.
///
/// Clones share the same storage, so a clone can be handed to the client
/// while the first handle is inspected afterwards.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    seen: Arc<Mutex<Vec<Diagnostic>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything collected so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns everything collected so far.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.seen.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}

//! Newline-delimited JSON decoding.
//!
//! [`StreamDecoder`] keeps one growing buffer per call. Complete lines are
//! parsed and handed out as soon as they arrive; a line split across
//! chunks waits in the buffer for the rest of its bytes.

use std::error::Error as StdError;
use std::pin::pin;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::casing::normalize_keys;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::ResponseError;

/// Default upper bound for a single buffered record.
pub const DEFAULT_MAX_RECORD_BYTES: usize = 16 * 1024 * 1024;

/// Incremental NDJSON decoder.
///
/// ## Examples
///
/// ```
/// use std::sync::Arc;
/// use api_runtime::diagnostics::TracingSink;
/// use api_runtime::response::StreamDecoder;
/// use serde_json::json;
///
/// let mut decoder = StreamDecoder::new(Arc::new(TracingSink));
/// assert_eq!(decoder.push(b"{\"Id\":1}\n{\"Id\""), vec![json!({ "id": 1 })]);
/// assert_eq!(decoder.push(b":2}\n"), vec![json!({ "id": 2 })]);
/// assert_eq!(decoder.finish(), None);
/// ```
#[derive(Debug)]
pub struct StreamDecoder {
    buffer: BytesMut,
    /// Bytes of `buffer` already known to contain no newline.
    scanned: usize,
    max_record_bytes: usize,
    /// Set while the rest of an oversized record is being thrown away.
    discarding: bool,
    sink: Arc<dyn DiagnosticSink>,
}

impl StreamDecoder {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            discarding: false,
            sink,
        }
    }

    /// Caps how many bytes a record may buffer while waiting for its
    /// newline.
    pub fn with_max_record_bytes(mut self, limit: usize) -> Self {
        self.max_record_bytes = limit;
        self
    }

    /// Number of bytes waiting for the end of their line.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Appends a chunk and returns every record it completed, in order.
    ///
    /// Blank lines are skipped. A complete line that is not JSON is
    /// reported as [`Diagnostic::MalformedRecord`] and skipped. A record
    /// that outgrows the size limit is reported once as
    /// [`Diagnostic::OversizedRecord`] and skipped up to its newline.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.buffer.extend_from_slice(chunk);
        let mut records = Vec::new();

        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let mut line = self.buffer.split_to(self.scanned + offset + 1);
            self.scanned = 0;
            if self.discarding {
                self.discarding = false;
                continue;
            }
            line.truncate(line.len() - 1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            if let Some(record) = self.parse_line(&line) {
                records.push(record);
            }
        }

        if self.discarding {
            self.buffer.clear();
        } else if self.buffer.len() > self.max_record_bytes {
            self.sink.emit(Diagnostic::OversizedRecord {
                limit: self.max_record_bytes,
            });
            self.buffer.clear();
            self.discarding = true;
        }
        self.scanned = self.buffer.len();
        records
    }

    /// Ends the stream and parses whatever is left in the buffer.
    ///
    /// A tail that is not a complete record is dropped and reported as
    /// [`Diagnostic::TruncatedStream`].
    pub fn finish(mut self) -> Option<Value> {
        if self.discarding {
            return None;
        }
        let tail = self.buffer.split().freeze();
        if tail.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        match serde_json::from_slice::<Value>(&tail) {
            Ok(record) => Some(normalize_keys(record)),
            Err(_) => {
                self.sink.emit(Diagnostic::TruncatedStream {
                    remaining_bytes: tail.len(),
                });
                None
            }
        }
    }

    fn parse_line(&self, line: &[u8]) -> Option<Value> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        match serde_json::from_slice::<Value>(line) {
            Ok(record) => Some(normalize_keys(record)),
            Err(_) => {
                self.sink.emit(Diagnostic::MalformedRecord {
                    line: String::from_utf8_lossy(line).into_owned(),
                });
                None
            }
        }
    }
}

/// Folds every record of an NDJSON byte stream into an accumulator.
///
/// Records are key-normalized and folded strictly in arrival order.
///
/// ## Errors
///
/// Returns [`ResponseError::Stream`] if the underlying stream yields an
/// error; the partial accumulator is discarded.
pub async fn decode_stream<S, E, A, F>(
    stream: S,
    initial: A,
    mut fold: F,
    sink: Arc<dyn DiagnosticSink>,
) -> Result<A, ResponseError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Box<dyn StdError + Send + Sync>>,
    F: FnMut(A, Value) -> A,
{
    let mut stream = pin!(stream);
    let mut decoder = StreamDecoder::new(sink);
    let mut accumulator = initial;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ResponseError::stream)?;
        for record in decoder.push(&chunk) {
            accumulator = fold(accumulator, record);
        }
    }
    if let Some(record) = decoder.finish() {
        accumulator = fold(accumulator, record);
    }
    Ok(accumulator)
}

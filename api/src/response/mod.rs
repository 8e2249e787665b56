//! Response decoding.
//!
//! A successful response is either one JSON document or, for streaming
//! operations, newline-delimited JSON folded record by record. Either way
//! object keys are normalized to lower camel case before the caller sees
//! them.

mod decode;
mod result;
pub mod stream;

pub(crate) use decode::{decode_json, error_body_from};
pub use result::RunResult;
pub use stream::{decode_stream, StreamDecoder, DEFAULT_MAX_RECORD_BYTES};

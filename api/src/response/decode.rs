use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::casing::normalize_keys;
use crate::error::ResponseError;

/// Decodes a single-document success body.
///
/// Returns `Ok(None)` for an empty (or all-whitespace) body.
pub(crate) fn decode_json(body: &[u8]) -> Result<Option<Value>, ResponseError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: Value = serde_json::from_slice(body)?;
    Ok(Some(normalize_keys(value)))
}

/// Decodes an error body: JSON when it parses, the raw text otherwise.
pub(crate) fn error_body(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// Error body of a response whose read may have failed.
///
/// A failed read becomes a string naming the read error.
pub(crate) fn error_body_from<B, E>(read: Result<B, E>) -> Value
where
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    match read {
        Ok(body) => error_body(body.as_ref()),
        Err(e) => {
            warn!(error = %e, "failed to read error response body");
            Value::String(format!("failed to read response body: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn test_decode_normalizes_keys() {
        let decoded = decode_json(br#"{"Id": 5, "Flight_Ids": [1]}"#).unwrap();
        assert_eq!(decoded, Some(json!({ "id": 5, "flightIds": [1] })));
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(decode_json(b"").unwrap(), None);
        assert_eq!(decode_json(b" \n").unwrap(), None);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            decode_json(b"<html>"),
            Err(ResponseError::Decode(_))
        ));
    }

    #[test]
    fn test_error_body_falls_back_to_text() {
        assert_eq!(error_body(br#"{"message":"no"}"#), json!({ "message": "no" }));
        assert_eq!(error_body(b"Bad Gateway"), json!("Bad Gateway"));
    }

    #[test]
    #[traced_test]
    fn test_unreadable_error_body_keeps_the_read_error() {
        let read: Result<Vec<u8>, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ));
        assert_eq!(
            error_body_from(read),
            json!("failed to read response body: connection reset")
        );
        assert!(logs_contain("failed to read error response body"));

        let read: Result<&[u8], std::io::Error> = Ok(b"{\"code\":7}".as_slice());
        assert_eq!(error_body_from(read), json!({ "code": 7 }));
    }
}

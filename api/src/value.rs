//! Caller-supplied request values.
//!
//! [`BodyValue`] is the dynamic value callers hand to the client. It is a
//! JSON value plus one extra variant, [`BodyValue::Binary`], which carries
//! file content as an explicit [`BinaryPayload`] instead of guessing at
//! runtime whether something "looks like" a buffer or a stream.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use futures::Stream;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

/// A boxed stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Object members of a [`BodyValue`].
pub type BodyMap = BTreeMap<String, BodyValue>;

/// An open byte stream that can be consumed exactly once.
///
/// Clones share the same underlying stream; whichever clone calls
/// [`take`](SharedStream::take) first receives it.
#[derive(Clone)]
pub struct SharedStream(Arc<Mutex<Option<ByteStream>>>);

impl SharedStream {
    /// Wraps a byte stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self(Arc::new(Mutex::new(Some(Box::pin(stream)))))
    }

    /// Takes the stream, leaving `None` behind for every other clone.
    pub fn take(&self) -> Option<ByteStream> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Returns `true` if the stream has already been taken.
    pub fn is_consumed(&self) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for SharedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStream")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

impl PartialEq for SharedStream {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Binary content attached to a request field.
#[derive(Debug, Clone, PartialEq)]
pub enum BinaryPayload {
    /// Raw bytes already in memory.
    Bytes(Bytes),
    /// An open byte stream.
    Stream(SharedStream),
    /// A filesystem path whose content should be sent.
    Path(PathBuf),
}

/// A dynamic request value.
///
/// ## Examples
///
/// ```
/// use api_runtime::BodyValue;
/// use serde_json::json;
///
/// let body = BodyValue::from(json!({ "name": "Acme", "isActive": true }));
/// assert_eq!(body.get("name").and_then(BodyValue::as_str), Some("Acme"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BodyValue {
    /// JSON null; also stands in for "no body".
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A JSON number.
    Number(Number),
    /// A string.
    String(String),
    /// An ordered list of values.
    Array(Vec<BodyValue>),
    /// An object keyed by property name.
    Object(BodyMap),
    /// Binary content.
    Binary(BinaryPayload),
}

impl BodyValue {
    /// Creates an empty object.
    pub fn object() -> Self {
        Self::Object(BodyMap::new())
    }

    /// Creates a binary value from in-memory bytes.
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self::Binary(BinaryPayload::Bytes(bytes.into()))
    }

    /// Creates a binary value from a filesystem path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Binary(BinaryPayload::Path(path.into()))
    }

    /// Creates a binary value from an open byte stream.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self::Binary(BinaryPayload::Stream(SharedStream::new(stream)))
    }

    /// Returns `true` for [`BodyValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number, if this is a number.
    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the members, if this is an object.
    pub fn as_object(&self) -> Option<&BodyMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the members mutably, if this is an object.
    pub fn as_object_mut(&mut self) -> Option<&mut BodyMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the elements, if this is an array.
    pub fn as_array(&self) -> Option<&[BodyValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up an object member by its exact key.
    pub fn get(&self, key: &str) -> Option<&BodyValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Binary(_) => "binary",
        }
    }

    /// Compares against a JSON value from a contract (enum members, defaults).
    pub fn matches_json(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Value::Null) => true,
            (Self::Bool(a), Value::Bool(b)) => a == b,
            (Self::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
            (Self::String(a), Value::String(b)) => a == b,
            (Self::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches_json(y))
            }
            (Self::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.matches_json(other)))
            }
            _ => false,
        }
    }

    /// Renders a value as a single text field (query strings, form fields).
    ///
    /// Returns `None` for null and for in-memory binary content.
    pub(crate) fn render_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Array(_) | Self::Object(_) => serde_json::to_string(self).ok(),
            Self::Binary(BinaryPayload::Path(path)) => Some(path.display().to_string()),
            Self::Binary(_) => None,
        }
    }
}

impl From<Value> for BodyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for BodyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for BodyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for BodyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for BodyValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<BinaryPayload> for BodyValue {
    fn from(value: BinaryPayload) -> Self {
        Self::Binary(value)
    }
}

impl From<BodyMap> for BodyValue {
    fn from(value: BodyMap) -> Self {
        Self::Object(value)
    }
}

impl From<Vec<BodyValue>> for BodyValue {
    fn from(value: Vec<BodyValue>) -> Self {
        Self::Array(value)
    }
}

impl Serialize for BodyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Self::Binary(BinaryPayload::Bytes(bytes)) => serializer.serialize_bytes(bytes),
            Self::Binary(BinaryPayload::Path(path)) => {
                serializer.serialize_str(&path.display().to_string())
            }
            Self::Binary(BinaryPayload::Stream(_)) => Err(S::Error::custom(
                "byte streams can only be sent as multipart form data",
            )),
        }
    }
}

use serde_json::Value;

/// What a successful call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    /// 204 or an empty body.
    Empty,
    /// One decoded JSON document.
    Json(Value),
    /// Every record of a streaming response, in arrival order.
    Records(Vec<Value>),
}

impl RunResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the decoded document, if this is a single-document result.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the records, if this is a streaming result.
    pub fn records(&self) -> Option<&[Value]> {
        match self {
            Self::Records(records) => Some(records),
            _ => None,
        }
    }

    /// Collapses into one JSON value: `null`, the document, or an array of
    /// records.
    pub fn into_json(self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Json(value) => value,
            Self::Records(records) => Value::Array(records),
        }
    }
}

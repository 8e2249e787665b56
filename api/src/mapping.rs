//! Schema-driven value mapping.
//!
//! [`PropertyMapper`] walks a schema and a caller value together, like the
//! validator, but produces the value that goes on the wire: property names
//! restored to the contract's casing, defaults filled in, dates rendered in
//! their fixed forms and binary file paths read into memory.
//!
//! Mapping is permissive. It runs even when validation failed, and a value
//! that does not fit its schema passes through unchanged. Unknown keys and
//! deprecated properties are reported to the mapper's [`DiagnosticSink`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::casing::normalize_key;
use crate::datetime::{parse_iso8601, render_date, render_date_time};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::MappingError;
use crate::schema::{SchemaKind, SchemaNode, SchemaType, StringFormat};
use crate::value::{BinaryPayload, BodyMap, BodyValue};

type MapFn = for<'a> fn(
    &'a PropertyMapper,
    &'a SchemaNode,
    BodyValue,
    &'a str,
) -> BoxFuture<'a, Result<BodyValue, MappingError>>;

/// Recursive schema mapper.
///
/// ## Examples
///
/// ```
/// # tokio_test_block(async {
/// use api_runtime::mapping::PropertyMapper;
/// use api_runtime::schema::SchemaNode;
/// use api_runtime::BodyValue;
/// use serde_json::json;
///
/// let schema = SchemaNode::from_json(&json!({
///     "type": "object",
///     "properties": {
///         "StartDate": { "type": "string", "format": "date" },
///         "IsActive": { "type": "boolean", "default": true }
///     }
/// })).unwrap();
///
/// let mapped = PropertyMapper::default()
///     .map(&schema, Some(BodyValue::from(json!({ "startDate": "2021-09-01T08:00:00Z" }))))
///     .await
///     .unwrap();
///
/// assert_eq!(
///     mapped,
///     Some(BodyValue::from(json!({ "IsActive": true, "StartDate": "2021-09-01" })))
/// );
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct PropertyMapper {
    handlers: HashMap<SchemaType, MapFn>,
    sink: Arc<dyn DiagnosticSink>,
}

impl fmt::Debug for PropertyMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMapper")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("sink", &self.sink)
            .finish()
    }
}

impl Default for PropertyMapper {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl PropertyMapper {
    /// Creates a mapper reporting to `sink`.
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        let mut handlers: HashMap<SchemaType, MapFn> = HashMap::new();
        handlers.insert(SchemaType::Object, map_object);
        handlers.insert(SchemaType::Array, map_array);
        handlers.insert(SchemaType::String, map_string);
        Self { handlers, sink }
    }

    /// Returns the sink diagnostics are reported to.
    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    /// Maps a request body.
    ///
    /// `None` means "not supplied"; the schema's default is used if it has
    /// one, otherwise the result is `None` as well.
    ///
    /// ## Errors
    ///
    /// Returns [`MappingError::Io`] if a binary field names a file that
    /// exists but cannot be read.
    pub async fn map(
        &self,
        schema: &SchemaNode,
        value: Option<BodyValue>,
    ) -> Result<Option<BodyValue>, MappingError> {
        self.map_at(schema, value, "body").await
    }

    /// Maps the value of a single named property (a query or path
    /// parameter, for example).
    pub async fn map_property(
        &self,
        schema: &SchemaNode,
        value: Option<BodyValue>,
        property: &str,
    ) -> Result<Option<BodyValue>, MappingError> {
        let name = normalize_key(property);
        self.map_at(schema, value, &name).await
    }

    fn map_at<'a>(
        &'a self,
        schema: &'a SchemaNode,
        value: Option<BodyValue>,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Option<BodyValue>, MappingError>> {
        Box::pin(async move {
            let value = match (value, &schema.default) {
                (Some(value), _) => value,
                (None, Some(default)) => BodyValue::from(default.clone()),
                (None, None) => return Ok(None),
            };
            if value.is_null() {
                return Ok(Some(BodyValue::Null));
            }
            match self.handlers.get(&schema.schema_type()) {
                Some(handler) => handler(self, schema, value, path).await.map(Some),
                None => Ok(Some(value)),
            }
        })
    }
}

fn map_object<'a>(
    mapper: &'a PropertyMapper,
    schema: &'a SchemaNode,
    value: BodyValue,
    path: &'a str,
) -> BoxFuture<'a, Result<BodyValue, MappingError>> {
    Box::pin(async move {
        let SchemaKind::Object(object) = &schema.kind else {
            return Ok(value);
        };
        let BodyValue::Object(members) = value else {
            return Ok(value);
        };

        let mut supplied: BTreeMap<String, BodyValue> = members
            .into_iter()
            .map(|(k, v)| (normalize_key(&k), v))
            .collect();

        let mut out = BodyMap::new();
        for (property, child_schema) in &object.properties {
            let key = normalize_key(property);
            let child = supplied.remove(&key);
            if child.is_some() && child_schema.deprecated {
                mapper.sink.emit(Diagnostic::DeprecatedProperty {
                    property: property.clone(),
                    path: path.to_string(),
                });
            }
            let child_path = format!("{path}.{key}");
            if let Some(mapped) = mapper.map_at(child_schema, child, &child_path).await? {
                out.insert(property.clone(), mapped);
            }
        }

        for property in supplied.into_keys() {
            mapper.sink.emit(Diagnostic::UnsupportedProperty {
                property,
                path: path.to_string(),
            });
        }

        Ok(BodyValue::Object(out))
    })
}

fn map_array<'a>(
    mapper: &'a PropertyMapper,
    schema: &'a SchemaNode,
    value: BodyValue,
    path: &'a str,
) -> BoxFuture<'a, Result<BodyValue, MappingError>> {
    Box::pin(async move {
        let SchemaKind::Array(array) = &schema.kind else {
            return Ok(value);
        };
        let Some(items) = array.items.as_deref() else {
            return Ok(value);
        };
        let BodyValue::Array(elements) = value else {
            return Ok(value);
        };

        let mut out = Vec::with_capacity(elements.len());
        for (i, element) in elements.into_iter().enumerate() {
            let element_path = format!("{path}[{i}]");
            let mapped = mapper
                .map_at(items, Some(element), &element_path)
                .await?;
            out.push(mapped.unwrap_or_default());
        }
        Ok(BodyValue::Array(out))
    })
}

fn map_string<'a>(
    _mapper: &'a PropertyMapper,
    schema: &'a SchemaNode,
    value: BodyValue,
    path: &'a str,
) -> BoxFuture<'a, Result<BodyValue, MappingError>> {
    Box::pin(async move {
        let SchemaKind::String(string) = &schema.kind else {
            return Ok(value);
        };
        match &string.format {
            Some(StringFormat::Date) => Ok(rerender(value, render_date)),
            Some(StringFormat::DateTime) => Ok(rerender(value, render_date_time)),
            Some(StringFormat::Binary) => resolve_binary(value, path).await,
            _ => Ok(value),
        }
    })
}

fn rerender(value: BodyValue, render: fn(&chrono::DateTime<chrono::Utc>) -> String) -> BodyValue {
    match value.as_str().and_then(parse_iso8601) {
        Some(parsed) => BodyValue::String(render(&parsed)),
        None => value,
    }
}

/// Reads a file-path value into memory if it names a regular file.
async fn resolve_binary(value: BodyValue, path: &str) -> Result<BodyValue, MappingError> {
    let file = match &value {
        BodyValue::Binary(BinaryPayload::Path(file)) => Some(file.clone()),
        BodyValue::String(text) => Some(PathBuf::from(text)),
        _ => None,
    };
    let Some(file) = file else {
        return Ok(value);
    };
    let is_file = tokio::fs::metadata(&file)
        .await
        .is_ok_and(|meta| meta.is_file());
    if !is_file {
        return Ok(value);
    }
    let content = tokio::fs::read(&file)
        .await
        .map_err(|source| MappingError::Io {
            property: path.to_string(),
            path: file,
            source,
        })?;
    Ok(BodyValue::bytes(content))
}

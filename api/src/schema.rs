//! Schema nodes interpreted at call time.
//!
//! A [`SchemaNode`] is the subset of an OpenAPI schema object that the
//! validator and mapper understand. Array `items` and object `properties`
//! live inside their [`SchemaKind`] variant, so a string schema can never
//! carry properties.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use strum::{Display, EnumIter, EnumString};

use crate::error::ConfigError;

/// Type tag of a schema node; the key of the validator and mapper
/// dispatch tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SchemaType {
    /// `type: object`
    Object,
    /// `type: array`
    Array,
    /// `type: string`
    String,
    /// `type: number`
    Number,
    /// `type: integer`
    Integer,
    /// `type: boolean`
    Boolean,
    /// `type: null`
    Null,
    /// No (or an unrecognized) `type`.
    Unspecified,
}

/// Declared `format` of a string schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringFormat {
    /// `format: date`, rendered as `YYYY-MM-DD`.
    Date,
    /// `format: date-time`, rendered as RFC 3339.
    DateTime,
    /// `format: binary`, file content.
    Binary,
    /// Any other format; only the string type is enforced.
    Other(String),
}

impl From<&str> for StringFormat {
    fn from(format: &str) -> Self {
        match format {
            "date" => Self::Date,
            "date-time" => Self::DateTime,
            "binary" => Self::Binary,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Object-specific schema fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    /// Declared properties keyed by their contract name.
    pub properties: BTreeMap<String, SchemaNode>,
    /// Names of required properties.
    pub required: Vec<String>,
}

impl ObjectSchema {
    /// Returns `true` if `property` is listed as required.
    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }
}

/// Array-specific schema fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArraySchema {
    /// Schema every element must satisfy.
    pub items: Option<Box<SchemaNode>>,
}

/// String-specific schema fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringSchema {
    pub format: Option<StringFormat>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub enum_values: Vec<Value>,
}

/// Kind-specific part of a schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SchemaKind {
    Object(ObjectSchema),
    Array(ArraySchema),
    String(StringSchema),
    Number,
    Integer,
    Boolean,
    Null,
    #[default]
    Unspecified,
}

/// One location in a request schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub nullable: bool,
    pub default: Option<Value>,
    pub deprecated: bool,
}

impl SchemaNode {
    /// Creates a node of the given kind with no modifiers.
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// A plain `type: string` node.
    pub fn string() -> Self {
        Self::new(SchemaKind::String(StringSchema::default()))
    }

    /// A string node with the given format.
    pub fn formatted(format: StringFormat) -> Self {
        Self::new(SchemaKind::String(StringSchema {
            format: Some(format),
            ..Default::default()
        }))
    }

    /// A `type: array` node.
    pub fn array(items: Option<SchemaNode>) -> Self {
        Self::new(SchemaKind::Array(ArraySchema {
            items: items.map(Box::new),
        }))
    }

    /// A `type: object` node.
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        Self::new(SchemaKind::Object(ObjectSchema {
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            required: Vec::new(),
        }))
    }

    /// Marks the node nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Marks the node deprecated.
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Sets the required property list. Has no effect on non-object nodes.
    pub fn with_required<I, S>(mut self, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let SchemaKind::Object(object) = &mut self.kind {
            object.required = required.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Returns the dispatch tag for this node.
    pub fn schema_type(&self) -> SchemaType {
        match &self.kind {
            SchemaKind::Object(_) => SchemaType::Object,
            SchemaKind::Array(_) => SchemaType::Array,
            SchemaKind::String(_) => SchemaType::String,
            SchemaKind::Number => SchemaType::Number,
            SchemaKind::Integer => SchemaType::Integer,
            SchemaKind::Boolean => SchemaType::Boolean,
            SchemaKind::Null => SchemaType::Null,
            SchemaKind::Unspecified => SchemaType::Unspecified,
        }
    }

    /// Returns the object fields, if this is an object node.
    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaKind::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Returns `true` if this is an object schema declaring `property`
    /// (compared after casing normalization).
    pub fn declares_property(&self, property: &str) -> bool {
        let wanted = crate::casing::normalize_key(property);
        self.as_object().is_some_and(|object| {
            object
                .properties
                .keys()
                .any(|k| crate::casing::normalize_key(k) == wanted)
        })
    }

    /// Parses a schema from its JSON form.
    ///
    /// `$ref`s must already be inlined; a leftover reference parses as an
    /// unspecified node, which accepts anything.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::InvalidSchema`] if the JSON does not have the
    /// shape of a schema object.
    ///
    /// ## Examples
    ///
    /// ```
    /// use api_runtime::schema::{SchemaNode, SchemaType};
    /// use serde_json::json;
    ///
    /// let node = SchemaNode::from_json(&json!({
    ///     "type": "string",
    ///     "format": "date",
    ///     "nullable": true
    /// })).unwrap();
    /// assert_eq!(node.schema_type(), SchemaType::String);
    /// assert!(node.nullable);
    /// ```
    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        let raw: RawSchema =
            serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidSchema {
                message: e.to_string(),
            })?;
        raw.into_node()
    }
}

/// `type` may be a single name or (OpenAPI 3.1) a list including `"null"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawType {
    Single(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawSchema {
    #[serde(rename = "type")]
    schema_type: Option<RawType>,
    nullable: bool,
    format: Option<String>,
    #[serde(rename = "enum")]
    enum_values: Option<Vec<Value>>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<String>,
    items: Option<Box<RawSchema>>,
    properties: Option<BTreeMap<String, RawSchema>>,
    required: Option<Vec<String>>,
    default: Option<Value>,
    deprecated: bool,
}

impl RawSchema {
    fn into_node(self) -> Result<SchemaNode, ConfigError> {
        let mut nullable = self.nullable;
        let type_name = match self.schema_type {
            Some(RawType::Single(name)) => Some(name),
            Some(RawType::Many(names)) => {
                nullable |= names.iter().any(|n| n == "null");
                names
                    .iter()
                    .find(|n| n.as_str() != "null")
                    .or(names.first())
                    .cloned()
            }
            None if self.properties.is_some() => Some("object".to_string()),
            None if self.items.is_some() => Some("array".to_string()),
            None => None,
        };

        let schema_type = type_name
            .as_deref()
            .and_then(|name| name.parse::<SchemaType>().ok())
            .unwrap_or(SchemaType::Unspecified);

        let kind = match schema_type {
            SchemaType::Object => SchemaKind::Object(ObjectSchema {
                properties: self
                    .properties
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(k, v)| v.into_node().map(|node| (k, node)))
                    .collect::<Result<_, _>>()?,
                required: self.required.unwrap_or_default(),
            }),
            SchemaType::Array => SchemaKind::Array(ArraySchema {
                items: self
                    .items
                    .map(|items| items.into_node().map(Box::new))
                    .transpose()?,
            }),
            SchemaType::String => SchemaKind::String(StringSchema {
                pattern: self.pattern.map(checked_pattern).transpose()?,
                format: self.format.as_deref().map(StringFormat::from),
                min_length: self.min_length,
                max_length: self.max_length,
                enum_values: self.enum_values.unwrap_or_default(),
            }),
            SchemaType::Number => SchemaKind::Number,
            SchemaType::Integer => SchemaKind::Integer,
            SchemaType::Boolean => SchemaKind::Boolean,
            SchemaType::Null => SchemaKind::Null,
            SchemaType::Unspecified => SchemaKind::Unspecified,
        };

        Ok(SchemaNode {
            kind,
            nullable,
            default: self.default,
            deprecated: self.deprecated,
        })
    }
}

fn checked_pattern(pattern: String) -> Result<String, ConfigError> {
    match Regex::new(&pattern) {
        Ok(_) => Ok(pattern),
        Err(e) => Err(ConfigError::InvalidSchema {
            message: format!("pattern {pattern} does not compile: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_nested_object() {
        let node = SchemaNode::from_json(&json!({
            "type": "object",
            "required": ["Name"],
            "properties": {
                "Name": { "type": "string", "minLength": 1 },
                "Tags": { "type": "array", "items": { "type": "string" } },
                "StartDate": { "type": "string", "format": "date-time", "deprecated": true }
            }
        }))
        .unwrap();

        let object = node.as_object().expect("object schema");
        assert!(object.is_required("Name"));
        assert_eq!(object.properties.len(), 3);

        let tags = &object.properties["Tags"];
        let SchemaKind::Array(array) = &tags.kind else {
            panic!("expected array kind");
        };
        assert_eq!(
            array.items.as_ref().map(|i| i.schema_type()),
            Some(SchemaType::String)
        );
        assert!(object.properties["StartDate"].deprecated);
    }

    #[test]
    fn test_properties_dropped_from_non_objects() {
        let node = SchemaNode::from_json(&json!({
            "type": "string",
            "properties": { "a": { "type": "string" } }
        }))
        .unwrap();
        assert!(node.as_object().is_none());
    }

    #[test]
    fn test_type_list_with_null_is_nullable() {
        let node = SchemaNode::from_json(&json!({ "type": ["integer", "null"] })).unwrap();
        assert_eq!(node.schema_type(), SchemaType::Integer);
        assert!(node.nullable);
    }

    #[test]
    fn test_unknown_type_is_unspecified() {
        let node = SchemaNode::from_json(&json!({ "type": "file" })).unwrap();
        assert_eq!(node.schema_type(), SchemaType::Unspecified);

        let node = SchemaNode::from_json(&json!({ "$ref": "#/components/schemas/X" })).unwrap();
        assert_eq!(node.schema_type(), SchemaType::Unspecified);
    }

    #[test]
    fn test_uncompilable_pattern_is_rejected() {
        let result = SchemaNode::from_json(&json!({
            "type": "object",
            "properties": {
                "code": { "type": "string", "pattern": "[a-z" }
            }
        }));
        let Err(ConfigError::InvalidSchema { message }) = result else {
            panic!("expected invalid schema, got {result:?}");
        };
        assert!(message.starts_with("pattern [a-z does not compile"), "{message}");
    }

    #[test]
    fn test_invalid_schema_shape() {
        let result = SchemaNode::from_json(&json!({ "type": 42 }));
        assert!(matches!(result, Err(ConfigError::InvalidSchema { .. })));
    }

    #[test]
    fn test_declares_property_uses_normalized_casing() {
        let node = SchemaNode::object([("AdvertiserId", SchemaNode::new(SchemaKind::Integer))]);
        assert!(node.declares_property("advertiserId"));
        assert!(!node.declares_property("flightId"));
        assert!(!SchemaNode::string().declares_property("advertiserId"));
    }
}

//! Schema validation.
//!
//! [`Validator`] walks a [`SchemaNode`] and a caller value together and
//! reports every violation it finds. Invalid data never raises; it comes
//! back as a [`ValidationOutcome`].
//!
//! Dispatch goes through a table keyed by [`SchemaType`]. Every handler
//! receives the dispatching [`Validator`], so composite handlers recurse
//! through the same table.
//!
//! ## Examples
//!
//! ```
//! use api_runtime::schema::SchemaNode;
//! use api_runtime::validate::Validator;
//! use api_runtime::BodyValue;
//! use serde_json::json;
//!
//! let schema = SchemaNode::from_json(&json!({
//!     "type": "array",
//!     "items": { "type": "string" },
//!     "nullable": true
//! })).unwrap();
//! let validator = Validator::new();
//!
//! assert!(validator.validate(&schema, None).is_valid());
//!
//! let outcome = validator.validate(&schema, Some(&BodyValue::from(json!(["a", 1]))));
//! let failure = outcome.failure().unwrap();
//! assert_eq!(failure.failed_children().count(), 1);
//! ```

mod array;
mod object;
mod scalar;
mod string;

use std::collections::HashMap;
use std::fmt;

use crate::casing::normalize_key;
use crate::schema::{SchemaNode, SchemaType};
use crate::value::BodyValue;

/// Signature shared by every type handler.
///
/// `name` is the already normalized display name of the value.
pub(crate) type ValidateFn =
    fn(&Validator, &SchemaNode, Option<&BodyValue>, &str) -> ValidationOutcome;

/// Key of a child outcome inside a composite value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildKey {
    /// An object property, by normalized name.
    Property(String),
    /// An array element, by position.
    Index(usize),
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(name) => f.write_str(name),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Outcome for one property or element of a composite value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildOutcome {
    pub key: ChildKey,
    pub outcome: ValidationOutcome,
}

/// Why a value was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    /// Human readable summary naming the normalized property.
    pub message: String,
    /// Outcomes of every child of an object or array, in schema or element
    /// order. Empty for leaf values.
    pub children: Vec<ChildOutcome>,
}

impl ValidationFailure {
    /// Creates a leaf failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            children: Vec::new(),
        }
    }

    /// Iterates the children that failed.
    pub fn failed_children(&self) -> impl Iterator<Item = (&ChildKey, &ValidationFailure)> {
        self.children
            .iter()
            .filter_map(|child| child.outcome.failure().map(|f| (&child.key, f)))
    }

    /// Collects the messages of every failing leaf, depth first.
    pub fn leaf_messages(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        let mut any_child = false;
        for (_, child) in self.failed_children() {
            any_child = true;
            child.collect_leaves(out);
        }
        if !any_child {
            out.push(&self.message);
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed_children().next().is_none() {
            return f.write_str(&self.message);
        }
        write!(f, "{} ({})", self.message, self.leaf_messages().join("; "))
    }
}

/// Result of validating one value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(ValidationFailure),
}

impl ValidationOutcome {
    /// Shorthand for a leaf failure.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(ValidationFailure::new(message))
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Returns the failure, if any.
    pub fn failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Valid => None,
            Self::Invalid(failure) => Some(failure),
        }
    }

    /// Converts into a `Result`.
    pub fn into_result(self) -> Result<(), ValidationFailure> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(failure) => Err(failure),
        }
    }
}

/// Recursive schema validator.
#[derive(Clone)]
pub struct Validator {
    handlers: HashMap<SchemaType, ValidateFn>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Validator {
    fn default() -> Self {
        let mut handlers: HashMap<SchemaType, ValidateFn> = HashMap::new();
        handlers.insert(SchemaType::Object, object::validate_object);
        handlers.insert(SchemaType::Array, array::validate_array);
        handlers.insert(SchemaType::String, string::validate_string);
        handlers.insert(SchemaType::Integer, scalar::validate_integer);
        handlers.insert(SchemaType::Number, scalar::validate_number);
        handlers.insert(SchemaType::Boolean, scalar::validate_boolean);
        handlers.insert(SchemaType::Null, always_valid);
        handlers.insert(SchemaType::Unspecified, always_valid);
        Self { handlers }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates an anonymous value; messages refer to it as `value`.
    ///
    /// `None` means the value was not supplied at all.
    pub fn validate(&self, schema: &SchemaNode, value: Option<&BodyValue>) -> ValidationOutcome {
        self.dispatch(schema, value, "value")
    }

    /// Validates the value of a named property.
    pub fn validate_property(
        &self,
        schema: &SchemaNode,
        value: Option<&BodyValue>,
        property: &str,
    ) -> ValidationOutcome {
        self.dispatch(schema, value, &normalize_key(property))
    }

    pub(crate) fn dispatch(
        &self,
        schema: &SchemaNode,
        value: Option<&BodyValue>,
        name: &str,
    ) -> ValidationOutcome {
        match self.handlers.get(&schema.schema_type()) {
            Some(handler) => handler(self, schema, value, name),
            None => ValidationOutcome::Valid,
        }
    }
}

fn always_valid(_: &Validator, _: &SchemaNode, _: Option<&BodyValue>, _: &str) -> ValidationOutcome {
    ValidationOutcome::Valid
}

/// Returns the value if it is present, or the outcome for an absent value.
///
/// A missing value and an explicit null are both absent. Absent values
/// pass when the schema is nullable and fail otherwise.
pub(crate) fn require_present<'v>(
    schema: &SchemaNode,
    value: Option<&'v BodyValue>,
    name: &str,
) -> Result<&'v BodyValue, ValidationOutcome> {
    match value {
        Some(v) if !v.is_null() => Ok(v),
        _ if schema.nullable => Err(ValidationOutcome::Valid),
        _ => Err(ValidationOutcome::invalid(format!("`{name}` is not nullable"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaKind, StringFormat};
    use serde_json::json;

    fn body(value: serde_json::Value) -> BodyValue {
        BodyValue::from(value)
    }

    #[test]
    fn test_nullable_rule_is_uniform() {
        let validator = Validator::new();
        let kinds = [
            SchemaNode::object(Vec::<(String, SchemaNode)>::new()),
            SchemaNode::array(None),
            SchemaNode::string(),
            SchemaNode::new(SchemaKind::Number),
            SchemaNode::new(SchemaKind::Integer),
            SchemaNode::new(SchemaKind::Boolean),
        ];
        for schema in kinds {
            assert!(
                validator.validate(&schema.clone().nullable(), None).is_valid(),
                "{:?}",
                schema.schema_type()
            );
            assert!(validator
                .validate(&schema.clone().nullable(), Some(&BodyValue::Null))
                .is_valid());

            let outcome = validator.validate_property(&schema, None, "Start_Date");
            assert_eq!(
                outcome.failure().map(|f| f.message.as_str()),
                Some("`startDate` is not nullable")
            );
        }
    }

    #[test]
    fn test_null_and_unspecified_always_pass() {
        let validator = Validator::new();
        assert!(validator
            .validate(&SchemaNode::new(SchemaKind::Null), None)
            .is_valid());
        assert!(validator
            .validate(&SchemaNode::default(), Some(&body(json!({ "x": 1 }))))
            .is_valid());
    }

    #[test]
    fn test_nullable_date() {
        let schema = SchemaNode::formatted(StringFormat::Date).nullable();
        let validator = Validator::new();

        assert!(validator.validate(&schema, None).is_valid());
        assert!(validator
            .validate(&schema, Some(&body(json!("2021-09-01"))))
            .is_valid());

        let outcome = validator.validate_property(&schema, Some(&body(json!("2021-09-01T"))), "day");
        assert_eq!(
            outcome.failure().map(|f| f.message.as_str()),
            Some("`day` must be a valid Date")
        );
    }

    #[test]
    fn test_failure_display_lists_leaves() {
        let schema = SchemaNode::object([
            ("name", SchemaNode::string()),
            ("count", SchemaNode::new(SchemaKind::Integer)),
        ]);
        let outcome = Validator::new().validate_property(
            &schema,
            Some(&body(json!({ "count": 1.5 }))),
            "body",
        );
        let failure = outcome.failure().expect("should fail");
        assert_eq!(
            failure.to_string(),
            "`body`: at least one property is invalid (`count` must be a valid integer; `name` is not nullable)"
        );
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationOutcome::Valid.into_result().is_ok());
        let err = ValidationOutcome::invalid("nope").into_result().unwrap_err();
        assert_eq!(err.message, "nope");
        assert!(err.children.is_empty());
    }
}

use super::{require_present, ValidationOutcome, Validator};
use crate::schema::SchemaNode;
use crate::value::BodyValue;

pub(super) fn validate_integer(
    _validator: &Validator,
    schema: &SchemaNode,
    value: Option<&BodyValue>,
    name: &str,
) -> ValidationOutcome {
    let value = match require_present(schema, value, name) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    let whole = value.as_number().is_some_and(|n| {
        n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
    });
    if whole {
        ValidationOutcome::Valid
    } else {
        ValidationOutcome::invalid(format!("`{name}` must be a valid integer"))
    }
}

pub(super) fn validate_number(
    _validator: &Validator,
    schema: &SchemaNode,
    value: Option<&BodyValue>,
    name: &str,
) -> ValidationOutcome {
    match require_present(schema, value, name) {
        Ok(BodyValue::Number(_)) => ValidationOutcome::Valid,
        Ok(_) => ValidationOutcome::invalid(format!("`{name}` must be a valid number")),
        Err(outcome) => outcome,
    }
}

pub(super) fn validate_boolean(
    _validator: &Validator,
    schema: &SchemaNode,
    value: Option<&BodyValue>,
    name: &str,
) -> ValidationOutcome {
    match require_present(schema, value, name) {
        Ok(BodyValue::Bool(_)) => ValidationOutcome::Valid,
        Ok(_) => ValidationOutcome::invalid(format!("`{name}` must be a valid boolean")),
        Err(outcome) => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaKind;
    use serde_json::json;

    fn check(kind: SchemaKind, value: serde_json::Value) -> ValidationOutcome {
        Validator::new().validate_property(
            &SchemaNode::new(kind),
            Some(&BodyValue::from(value)),
            "amount",
        )
    }

    #[test]
    fn test_integer() {
        assert!(check(SchemaKind::Integer, json!(42)).is_valid());
        assert!(check(SchemaKind::Integer, json!(-3)).is_valid());
        assert!(check(SchemaKind::Integer, json!(2.0)).is_valid());
        assert_eq!(
            check(SchemaKind::Integer, json!(2.5)).failure().map(|f| f.message.clone()),
            Some("`amount` must be a valid integer".to_string())
        );
        assert!(!check(SchemaKind::Integer, json!("42")).is_valid());
    }

    #[test]
    fn test_number() {
        assert!(check(SchemaKind::Number, json!(2.5)).is_valid());
        assert_eq!(
            check(SchemaKind::Number, json!(true)).failure().map(|f| f.message.clone()),
            Some("`amount` must be a valid number".to_string())
        );
    }

    #[test]
    fn test_boolean() {
        assert!(check(SchemaKind::Boolean, json!(false)).is_valid());
        assert_eq!(
            check(SchemaKind::Boolean, json!("false")).failure().map(|f| f.message.clone()),
            Some("`amount` must be a valid boolean".to_string())
        );
    }
}

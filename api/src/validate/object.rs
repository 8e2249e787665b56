use std::collections::HashMap;

use super::{require_present, ChildKey, ChildOutcome, ValidationFailure, ValidationOutcome, Validator};
use crate::casing::normalize_key;
use crate::schema::{SchemaKind, SchemaNode};
use crate::value::BodyValue;

pub(super) fn validate_object(
    validator: &Validator,
    schema: &SchemaNode,
    value: Option<&BodyValue>,
    name: &str,
) -> ValidationOutcome {
    let value = match require_present(schema, value, name) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    let SchemaKind::Object(object) = &schema.kind else {
        return ValidationOutcome::Valid;
    };
    let Some(members) = value.as_object() else {
        return ValidationOutcome::invalid(format!("`{name}` must be an object"));
    };

    let by_key: HashMap<String, &BodyValue> = members
        .iter()
        .map(|(k, v)| (normalize_key(k), v))
        .collect();

    let mut children = Vec::with_capacity(object.properties.len());
    for (property, child_schema) in &object.properties {
        let key = normalize_key(property);
        let child_value = by_key.get(&key).copied();

        // required means "key present"; an explicit null is left to the
        // child's nullable flag
        let outcome = if child_value.is_none() && object.is_required(property) {
            ValidationOutcome::invalid(format!("`{key}` is required"))
        } else if child_value.is_none() && child_schema.default.is_some() {
            // the mapper fills it in
            ValidationOutcome::Valid
        } else {
            validator.dispatch(child_schema, child_value, &key)
        };
        children.push(ChildOutcome {
            key: ChildKey::Property(key),
            outcome,
        });
    }

    if children.iter().all(|c| c.outcome.is_valid()) {
        return ValidationOutcome::Valid;
    }
    ValidationOutcome::Invalid(ValidationFailure {
        message: format!("`{name}`: at least one property is invalid"),
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flight_schema() -> SchemaNode {
        SchemaNode::from_json(&json!({
            "type": "object",
            "required": ["Name", "CampaignId"],
            "properties": {
                "Name": { "type": "string" },
                "CampaignId": { "type": "integer" },
                "EndDate": { "type": "string", "format": "date-time", "nullable": true },
                "Notes": { "type": "string" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_keys_matched_after_normalization() {
        let value = BodyValue::from(json!({
            "name": "Spring",
            "campaign_id": 7,
            "Notes": "n/a"
        }));
        let outcome = Validator::new().validate(&flight_schema(), Some(&value));
        assert!(outcome.is_valid(), "{outcome:?}");
    }

    #[test]
    fn test_required_is_independent_of_nullability() {
        let schema = SchemaNode::object([("id", SchemaNode::string().nullable())])
            .with_required(["id"]);
        let outcome = Validator::new().validate(&schema, Some(&BodyValue::object()));
        let failure = outcome.failure().expect("missing required key");
        let failed: Vec<_> = failure.failed_children().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, &ChildKey::Property("id".to_string()));
        assert_eq!(failed[0].1.message, "`id` is required");

        // explicit null on a nullable required property is fine
        let outcome = Validator::new().validate(&schema, Some(&BodyValue::from(json!({ "id": null }))));
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_collects_every_child() {
        let value = BodyValue::from(json!({ "Name": 5, "EndDate": "soon" }));
        let outcome = Validator::new().validate(&flight_schema(), Some(&value));
        let failure = outcome.failure().unwrap();

        assert_eq!(failure.children.len(), 4);
        let messages: Vec<_> = failure.failed_children().map(|(_, f)| f.message.clone()).collect();
        assert_eq!(
            messages,
            vec![
                "`campaignId` is required",
                "`endDate` must be a valid Date",
                "`name` must be a string",
                "`notes` is not nullable",
            ]
        );
    }

    #[test]
    fn test_absent_property_with_default_passes() {
        let schema = SchemaNode::from_json(&json!({
            "type": "object",
            "required": ["Title"],
            "properties": {
                "Title": { "type": "string" },
                "IsActive": { "type": "boolean", "default": true }
            }
        }))
        .unwrap();
        let validator = Validator::new();

        let outcome = validator.validate(&schema, Some(&BodyValue::from(json!({ "title": "x" }))));
        assert!(outcome.is_valid(), "{outcome:?}");

        // an explicit null is still checked against nullability
        let outcome = validator.validate(
            &schema,
            Some(&BodyValue::from(json!({ "title": "x", "isActive": null }))),
        );
        assert!(!outcome.is_valid());
    }

    #[test]
    fn test_non_object_value() {
        let outcome = Validator::new().validate(&flight_schema(), Some(&BodyValue::from("x")));
        assert_eq!(
            outcome.failure().map(|f| f.message.as_str()),
            Some("`value` must be an object")
        );
    }
}

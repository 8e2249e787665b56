use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::{require_present, ValidationOutcome, Validator};
use crate::datetime::parse_iso8601;
use crate::schema::{SchemaKind, SchemaNode, StringFormat};
use crate::value::BodyValue;

pub(super) fn validate_string(
    _validator: &Validator,
    schema: &SchemaNode,
    value: Option<&BodyValue>,
    name: &str,
) -> ValidationOutcome {
    let value = match require_present(schema, value, name) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    let SchemaKind::String(string) = &schema.kind else {
        return ValidationOutcome::Valid;
    };

    let text = match string.format {
        Some(StringFormat::Binary) => {
            return match value {
                BodyValue::Binary(_) => ValidationOutcome::Valid,
                _ => ValidationOutcome::invalid(format!("`{name}` must be a binary payload")),
            };
        }
        Some(StringFormat::Date | StringFormat::DateTime) => {
            match value.as_str().filter(|s| parse_iso8601(s).is_some()) {
                Some(text) => text,
                None => return ValidationOutcome::invalid(format!("`{name}` must be a valid Date")),
            }
        }
        _ => match value.as_str() {
            Some(text) => text,
            None => return ValidationOutcome::invalid(format!("`{name}` must be a string")),
        },
    };

    let mut violations = Vec::new();
    let length = text.chars().count();
    if let Some(min) = string.min_length.filter(|min| length < *min) {
        violations.push(format!("`{name}` has a minimum length of {min}"));
    }
    if let Some(max) = string.max_length.filter(|max| length > *max) {
        violations.push(format!("`{name}` has a maximum length of {max}"));
    }
    if let Some(pattern) = &string.pattern {
        match Regex::new(pattern) {
            Ok(re) if !re.is_match(text) => {
                violations.push(format!("`{name}` must match the pattern {pattern}"));
            }
            Ok(_) => {}
            Err(e) => warn!(%pattern, error = %e, "skipping uncompilable pattern"),
        }
    }
    if !string.enum_values.is_empty() && !string.enum_values.iter().any(|v| value.matches_json(v)) {
        let allowed: Vec<String> = string.enum_values.iter().map(render_enum_member).collect();
        violations.push(format!(
            "`{name}` must be one of the following: {}",
            allowed.join(", ")
        ));
    }

    if violations.is_empty() {
        ValidationOutcome::Valid
    } else {
        ValidationOutcome::invalid(violations.join("; "))
    }
}

fn render_enum_member(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

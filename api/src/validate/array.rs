use super::{require_present, ChildKey, ChildOutcome, ValidationFailure, ValidationOutcome, Validator};
use crate::schema::{SchemaKind, SchemaNode};
use crate::value::BodyValue;

pub(super) fn validate_array(
    validator: &Validator,
    schema: &SchemaNode,
    value: Option<&BodyValue>,
    name: &str,
) -> ValidationOutcome {
    let value = match require_present(schema, value, name) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    let Some(elements) = value.as_array() else {
        return ValidationOutcome::invalid(format!("`{name}` must be an Array"));
    };
    let SchemaKind::Array(array) = &schema.kind else {
        return ValidationOutcome::Valid;
    };
    let Some(items) = array.items.as_deref() else {
        return ValidationOutcome::Valid;
    };

    let children: Vec<ChildOutcome> = elements
        .iter()
        .enumerate()
        .map(|(i, element)| ChildOutcome {
            key: ChildKey::Index(i),
            outcome: validator.dispatch(items, Some(element), &format!("{name}[{i}]")),
        })
        .collect();

    if children.iter().all(|c| c.outcome.is_valid()) {
        return ValidationOutcome::Valid;
    }
    ValidationOutcome::Invalid(ValidationFailure {
        message: format!("`{name}`: at least one item is invalid"),
        children,
    })
}

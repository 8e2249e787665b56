//! Key casing normalization.
//!
//! Contracts declare property, resource and operation names in whatever
//! casing their authors chose (`Foo_Bar`, `advertiser-id`, `FlightId`).
//! Callers always address them in lower camel case, so every lookup goes
//! through [`normalize_key`].

use heck::ToLowerCamelCase;
use serde_json::{Map, Value};

/// Upper bound on normalization passes.
const MAX_PASSES: usize = 4;

/// Normalizes a key to lower camel case.
///
/// The result is a fixed point: normalizing an already normalized key
/// returns it unchanged.
///
/// ## Examples
///
/// ```
/// use api_runtime::casing::normalize_key;
///
/// assert_eq!(normalize_key("Foo_Bar"), "fooBar");
/// assert_eq!(normalize_key("advertiser-id"), "advertiserId");
/// assert_eq!(normalize_key("fooBar"), "fooBar");
/// ```
pub fn normalize_key(key: &str) -> String {
    // heck alone is not idempotent on runs of single-letter words:
    // `x_a_b` becomes `xAB`, which then re-splits into `xAb`.
    let mut current = key.to_lower_camel_case();
    for _ in 0..MAX_PASSES {
        let next = current.to_lower_camel_case();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Recursively normalizes every object key in a JSON value.
///
/// Arrays are walked element by element; scalars are returned unchanged.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (normalize_key(&k), normalize_keys(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

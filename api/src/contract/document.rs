//! Raw document handling: deep merge and local `$ref` inlining.

use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Deep-merges `overlay` into `base`.
///
/// Objects merge key by key; any other value in `overlay` (arrays
/// included) replaces the value in `base`.
pub(crate) fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Merges a list of documents in order; later documents win.
pub(crate) fn merge_documents(documents: Vec<Value>) -> Result<Value, ConfigError> {
    let mut merged = Value::Object(Map::new());
    for (index, document) in documents.into_iter().enumerate() {
        if !document.is_object() {
            return Err(ConfigError::invalid_document(format!(
                "document {index} is not an object"
            )));
        }
        if document.get("paths").is_some_and(|p| !p.is_object()) {
            return Err(ConfigError::invalid_document(format!(
                "document {index} has a non-object `paths`"
            )));
        }
        deep_merge(&mut merged, document);
    }
    Ok(merged)
}

/// Inlines local (`#/...`) references against one merged document.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RefResolver<'a> {
    root: &'a Value,
}

impl<'a> RefResolver<'a> {
    pub(crate) fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// Returns a copy of `value` with every reference replaced by its
    /// target, recursively.
    ///
    /// ## Errors
    ///
    /// [`ConfigError::UnresolvableReference`] for external or dangling
    /// references, [`ConfigError::CyclicReference`] when a target refers
    /// back to itself.
    pub(crate) fn inline(&self, value: &Value) -> Result<Value, ConfigError> {
        let mut stack = Vec::new();
        self.inline_with(value, &mut stack)
    }

    /// Follows references at the top level only.
    pub(crate) fn follow<'v>(&self, value: &'v Value) -> Result<&'v Value, ConfigError>
    where
        'a: 'v,
    {
        let mut current = value;
        let mut seen: Vec<&str> = Vec::new();
        while let Some(reference) = reference_of(current) {
            if seen.contains(&reference) {
                return Err(ConfigError::CyclicReference {
                    reference: reference.to_string(),
                });
            }
            seen.push(reference);
            current = self.lookup(reference)?;
        }
        Ok(current)
    }

    fn inline_with(&self, value: &Value, stack: &mut Vec<String>) -> Result<Value, ConfigError> {
        match value {
            Value::Object(map) => {
                if let Some(reference) = reference_of(value) {
                    if stack.iter().any(|r| r == reference) {
                        return Err(ConfigError::CyclicReference {
                            reference: reference.to_string(),
                        });
                    }
                    let target = self.lookup(reference)?;
                    stack.push(reference.to_string());
                    let resolved = self.inline_with(target, stack);
                    stack.pop();
                    return resolved;
                }
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.inline_with(v, stack)?)))
                    .collect::<Result<Map<String, Value>, ConfigError>>()
                    .map(Value::Object)
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.inline_with(item, stack))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn lookup(&self, reference: &str) -> Result<&'a Value, ConfigError> {
        reference
            .strip_prefix('#')
            .and_then(|pointer| self.root.pointer(pointer))
            .ok_or_else(|| ConfigError::UnresolvableReference {
                reference: reference.to_string(),
            })
    }
}

fn reference_of(value: &Value) -> Option<&str> {
    value.get("$ref").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge_objects_and_replace_arrays() {
        let mut base = json!({ "a": { "x": 1, "list": [1, 2] }, "b": 1 });
        deep_merge(&mut base, json!({ "a": { "y": 2, "list": [3] }, "c": 3 }));
        assert_eq!(
            base,
            json!({ "a": { "x": 1, "y": 2, "list": [3] }, "b": 1, "c": 3 })
        );
    }

    #[test]
    fn test_merge_rejects_non_objects() {
        assert!(matches!(
            merge_documents(vec![json!({}), json!([1])]),
            Err(ConfigError::InvalidDocument { .. })
        ));
        assert!(matches!(
            merge_documents(vec![json!({ "paths": [] })]),
            Err(ConfigError::InvalidDocument { .. })
        ));
    }

    #[test]
    fn test_inline_nested_refs() {
        let root = json!({
            "components": {
                "schemas": {
                    "Id": { "type": "integer" },
                    "Flight": {
                        "type": "object",
                        "properties": { "Id": { "$ref": "#/components/schemas/Id" } }
                    }
                }
            }
        });
        let resolver = RefResolver::new(&root);
        let inlined = resolver
            .inline(&json!({ "$ref": "#/components/schemas/Flight" }))
            .unwrap();
        assert_eq!(
            inlined,
            json!({ "type": "object", "properties": { "Id": { "type": "integer" } } })
        );
    }

    #[test]
    fn test_same_ref_twice_is_not_a_cycle() {
        let root = json!({ "components": { "schemas": { "D": { "type": "string" } } } });
        let resolver = RefResolver::new(&root);
        let inlined = resolver
            .inline(&json!({
                "a": { "$ref": "#/components/schemas/D" },
                "b": { "$ref": "#/components/schemas/D" }
            }))
            .unwrap();
        assert_eq!(inlined["b"], json!({ "type": "string" }));
    }

    #[test]
    fn test_cycle_detected() {
        let root = json!({
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": { "Next": { "$ref": "#/components/schemas/Node" } }
                    }
                }
            }
        });
        let result = RefResolver::new(&root).inline(&json!({ "$ref": "#/components/schemas/Node" }));
        assert!(matches!(result, Err(ConfigError::CyclicReference { .. })));
    }

    #[test]
    fn test_unresolvable_refs() {
        let root = json!({});
        let resolver = RefResolver::new(&root);
        for reference in ["#/components/schemas/Missing", "other.yaml#/Thing"] {
            let result = resolver.inline(&json!({ "$ref": reference }));
            assert!(matches!(
                result,
                Err(ConfigError::UnresolvableReference { .. })
            ));
        }
    }

    #[test]
    fn test_follow_is_shallow() {
        let root = json!({
            "components": {
                "responses": {
                    "Ok": { "content": { "application/json": { "schema": { "$ref": "#/x" } } } }
                }
            }
        });
        let value = json!({ "$ref": "#/components/responses/Ok" });
        let followed = RefResolver::new(&root).follow(&value).unwrap();
        assert!(followed["content"]["application/json"]["schema"].get("$ref").is_some());
    }
}

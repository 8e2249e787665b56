//! Operations of the catalog and their URL templates.

use std::collections::HashMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use strum::{Display, EnumString};

use crate::error::ConfigError;
use crate::method::RestMethod;
use crate::schema::SchemaNode;

/// Characters left unescaped in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Where a parameter is placed in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

/// A declared path, query or header parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Name as declared; used on the wire.
    pub name: String,
    pub location: ParameterLocation,
    /// Path parameters are always required.
    pub required: bool,
    pub schema: SchemaNode,
}

/// Body schema for the first declared request content type.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBodySchema {
    pub content_type: String,
    pub required: bool,
    pub schema: SchemaNode,
}

/// One callable operation.
///
/// Built once with the [`ContractCatalog`](super::ContractCatalog) and
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub(crate) id: String,
    pub(crate) resource: String,
    pub(crate) method: RestMethod,
    pub(crate) path: String,
    pub(crate) path_parameters: Vec<Parameter>,
    pub(crate) query_parameters: Vec<Parameter>,
    pub(crate) header_parameters: Vec<Parameter>,
    pub(crate) security_schemes: Vec<String>,
    pub(crate) body: Option<RequestBodySchema>,
    pub(crate) streaming: bool,
}

impl Operation {
    /// Normalized operation name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Normalized resource name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// `resource.operation`, used in error messages and spans.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.resource, self.id)
    }

    pub fn method(&self) -> RestMethod {
        self.method
    }

    /// URL template with `{param}` placeholders.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_parameters(&self) -> &[Parameter] {
        &self.path_parameters
    }

    pub fn query_parameters(&self) -> &[Parameter] {
        &self.query_parameters
    }

    pub fn header_parameters(&self) -> &[Parameter] {
        &self.header_parameters
    }

    /// Names of the security schemes the operation requires.
    pub fn security_schemes(&self) -> &[String] {
        &self.security_schemes
    }

    pub fn body(&self) -> Option<&RequestBodySchema> {
        self.body.as_ref()
    }

    /// Whether responses are newline-delimited JSON.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Returns `true` if the body schema declares `property`.
    pub(crate) fn body_declares(&self, property: &str) -> bool {
        self.body
            .as_ref()
            .is_some_and(|body| body.schema.declares_property(property))
    }

    /// Substitutes path parameter values into the template.
    ///
    /// Values are percent-encoded as single path segments. Placeholders
    /// without a value are left as they are.
    pub fn render_path(&self, values: &HashMap<String, String>) -> String {
        let mut path = self.path.clone();
        for (name, value) in values {
            let encoded = utf8_percent_encode(value, PATH_SEGMENT).to_string();
            path = path.replace(&format!("{{{name}}}"), &encoded);
        }
        path
    }
}

/// Extracts placeholder names from a path template, in order.
///
/// ## Errors
///
/// Returns [`ConfigError::InvalidPathTemplate`] for unbalanced or nested
/// braces and empty placeholders.
pub(crate) fn template_placeholders(template: &str) -> Result<Vec<String>, ConfigError> {
    let mut names = Vec::new();
    let mut current: Option<String> = None;

    for c in template.chars() {
        match (c, current.as_mut()) {
            ('{', None) => current = Some(String::new()),
            ('{', Some(_)) => {
                return Err(ConfigError::invalid_path(format!(
                    "nested brace in {template}"
                )))
            }
            ('}', Some(_)) => {
                let name = current.take().unwrap_or_default();
                if name.is_empty() {
                    return Err(ConfigError::invalid_path(format!(
                        "empty placeholder in {template}"
                    )));
                }
                names.push(name);
            }
            ('}', None) => {
                return Err(ConfigError::invalid_path(format!(
                    "unopened brace in {template}"
                )))
            }
            (c, Some(name)) => name.push(c),
            (_, None) => {}
        }
    }

    if current.is_some() {
        return Err(ConfigError::invalid_path(format!(
            "unclosed brace in {template}"
        )));
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(path: &str) -> Operation {
        Operation {
            id: "get".to_string(),
            resource: "flight".to_string(),
            method: RestMethod::Get,
            path: path.to_string(),
            path_parameters: Vec::new(),
            query_parameters: Vec::new(),
            header_parameters: Vec::new(),
            security_schemes: Vec::new(),
            body: None,
            streaming: false,
        }
    }

    #[test]
    fn test_placeholders_in_order() {
        assert_eq!(
            template_placeholders("/advertiser/{advertiserId}/flight/{id}").unwrap(),
            vec!["advertiserId", "id"]
        );
        assert!(template_placeholders("/plain").unwrap().is_empty());
    }

    #[test]
    fn test_bad_templates() {
        for template in ["/a/{id", "/a/id}", "/a/{}", "/a/{{id}}"] {
            assert!(
                matches!(
                    template_placeholders(template),
                    Err(ConfigError::InvalidPathTemplate { .. })
                ),
                "{template}"
            );
        }
    }

    #[test]
    fn test_render_path_encodes_segments() {
        let op = operation("/flight/{id}/creative/{name}");
        let values = HashMap::from([
            ("id".to_string(), "42".to_string()),
            ("name".to_string(), "a b/c".to_string()),
        ]);
        assert_eq!(op.render_path(&values), "/flight/42/creative/a%20b%2Fc");
        assert_eq!(op.qualified_name(), "flight.get");
    }
}

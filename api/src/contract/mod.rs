//! The operation catalog.
//!
//! [`ContractCatalog`] merges any number of OpenAPI 3 documents into one
//! lookup table of resource → operation → [`Operation`]. Resources come
//! from tags, and resource and operation names are normalized to lower
//! camel case, so `Creative Template` / `GetCreativeTemplate` is looked up
//! as `creativeTemplate` / `getCreativeTemplate`.
//!
//! ## Examples
//!
//! ```
//! use api_runtime::ContractCatalog;
//! use serde_json::json;
//!
//! let advertisers = json!({
//!     "tags": [{ "name": "Advertiser" }],
//!     "paths": {
//!         "/advertiser/{id}": {
//!             "get": {
//!                 "operationId": "get",
//!                 "tags": ["Advertiser"],
//!                 "parameters": [
//!                     { "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } }
//!                 ]
//!             }
//!         }
//!     }
//! });
//! let catalog = ContractCatalog::from_documents([advertisers]).unwrap();
//! let get = catalog.operation("advertiser", "get").unwrap();
//! assert_eq!(get.path(), "/advertiser/{id}");
//! assert_eq!(get.path_parameters().len(), 1);
//! ```

mod document;
mod operation;
mod security;

pub use operation::{Operation, Parameter, ParameterLocation, RequestBodySchema};
pub use security::{SchemeLocation, SecurityScheme, SecuritySchemeRegistry};

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::casing::normalize_key;
use crate::error::ConfigError;
use crate::method::RestMethod;
use crate::schema::SchemaNode;
use document::{merge_documents, RefResolver};
use operation::template_placeholders;

/// Media type that marks an operation as streaming.
pub const NDJSON: &str = "application/x-ndjson";

/// Normalized view of every operation in a set of contract documents.
#[derive(Debug, Clone, Default)]
pub struct ContractCatalog {
    resources: BTreeMap<String, BTreeMap<String, Operation>>,
    security: SecuritySchemeRegistry,
}

impl ContractCatalog {
    /// Builds the catalog from parsed documents.
    ///
    /// Documents are deep-merged in order; later documents overlay earlier
    /// ones. Tags listed at the top of any document become (possibly empty)
    /// resources.
    ///
    /// ## Errors
    ///
    /// Returns a [`ConfigError`] for malformed documents, missing or
    /// duplicate operation ids, unsupported parameter locations, bad path
    /// templates and unresolvable or cyclic `$ref`s.
    pub fn from_documents<I>(documents: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Value>,
    {
        let documents: Vec<Value> = documents.into_iter().collect();

        let mut resources: BTreeMap<String, BTreeMap<String, Operation>> = BTreeMap::new();
        for tag in documents
            .iter()
            .filter_map(|d| d.get("tags").and_then(Value::as_array))
            .flatten()
            .filter_map(|t| t.get("name").and_then(Value::as_str))
        {
            resources.entry(normalize_key(tag)).or_default();
        }

        let merged = merge_documents(documents)?;
        let resolver = RefResolver::new(&merged);
        let security = SecuritySchemeRegistry::from_document(&merged)?;

        if let Some(paths) = merged.get("paths").and_then(Value::as_object) {
            for (path, item) in paths {
                let item = resolver.follow(item)?;
                let Some(item) = item.as_object() else {
                    continue;
                };
                let shared_parameters = item.get("parameters");

                for (key, raw) in item {
                    let Some(method) = RestMethod::from_path_item_key(key) else {
                        continue;
                    };
                    let built = build_operations(
                        &resolver,
                        &merged,
                        path,
                        method,
                        raw,
                        shared_parameters,
                    )?;
                    for operation in built {
                        let operations = resources.entry(operation.resource.clone()).or_default();
                        if operations.contains_key(&operation.id) {
                            return Err(ConfigError::DuplicateOperation {
                                resource: operation.resource,
                                operation: operation.id,
                            });
                        }
                        operations.insert(operation.id.clone(), operation);
                    }
                }
            }
        }

        debug!(
            resources = resources.len(),
            operations = resources.values().map(BTreeMap::len).sum::<usize>(),
            security_schemes = security.len(),
            "contract catalog built"
        );
        Ok(Self {
            resources,
            security,
        })
    }

    /// Builds the catalog from YAML (or JSON) document text.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::Yaml`] if a document does not parse, or any
    /// error [`from_documents`](Self::from_documents) returns.
    pub fn from_yaml_documents<I, S>(documents: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = documents
            .into_iter()
            .map(|text| serde_yaml::from_str::<Value>(text.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_documents(parsed)
    }

    /// Looks up an operation; both names are normalized first.
    ///
    /// ## Errors
    ///
    /// [`ConfigError::UnknownResource`] or [`ConfigError::UnknownOperation`].
    pub fn operation(&self, resource: &str, operation: &str) -> Result<&Operation, ConfigError> {
        let resource = normalize_key(resource);
        let operation = normalize_key(operation);
        let operations = self
            .resources
            .get(&resource)
            .ok_or_else(|| ConfigError::UnknownResource {
                resource: resource.clone(),
            })?;
        operations
            .get(&operation)
            .ok_or(ConfigError::UnknownOperation {
                resource,
                operation,
            })
    }

    /// Normalized resource names, sorted.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Operations of one resource, sorted by name.
    ///
    /// ## Errors
    ///
    /// [`ConfigError::UnknownResource`] if the resource does not exist.
    pub fn operations(
        &self,
        resource: &str,
    ) -> Result<impl Iterator<Item = &Operation>, ConfigError> {
        let resource = normalize_key(resource);
        self.resources
            .get(&resource)
            .map(BTreeMap::values)
            .ok_or(ConfigError::UnknownResource { resource })
    }

    pub fn security_schemes(&self) -> &SecuritySchemeRegistry {
        &self.security
    }
}

/// Builds one [`Operation`] per tag of an operation object.
fn build_operations(
    resolver: &RefResolver<'_>,
    root: &Value,
    path: &str,
    method: RestMethod,
    raw: &Value,
    shared_parameters: Option<&Value>,
) -> Result<Vec<Operation>, ConfigError> {
    let raw_id = raw
        .get("operationId")
        .and_then(Value::as_str)
        .ok_or_else(|| ConfigError::MissingOperationId {
            method: method.to_string(),
            path: path.to_string(),
        })?;
    let id = normalize_key(raw_id);

    let tags: Vec<String> = raw
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(normalize_key)
                .collect()
        })
        .unwrap_or_default();
    if tags.is_empty() {
        debug!(operation = %id, %path, "skipping untagged operation");
        return Ok(Vec::new());
    }

    let parameters = collect_parameters(resolver, &id, shared_parameters, raw.get("parameters"))?;
    let mut path_parameters = Vec::new();
    let mut query_parameters = Vec::new();
    let mut header_parameters = Vec::new();
    for parameter in parameters {
        match parameter.location {
            ParameterLocation::Path => path_parameters.push(parameter),
            ParameterLocation::Query => query_parameters.push(parameter),
            ParameterLocation::Header => header_parameters.push(parameter),
        }
    }

    for placeholder in template_placeholders(path)? {
        if !path_parameters.iter().any(|p| p.name == placeholder) {
            return Err(ConfigError::invalid_path(format!(
                "placeholder {{{placeholder}}} in {path} has no path parameter"
            )));
        }
    }

    let security_schemes: Vec<String> = raw
        .get("security")
        .or_else(|| root.get("security"))
        .and_then(Value::as_array)
        .map(|requirements| {
            requirements
                .iter()
                .filter_map(Value::as_object)
                .flat_map(|r| r.keys().cloned())
                .collect()
        })
        .unwrap_or_default();

    let body = match raw.get("requestBody") {
        Some(request_body) => request_body_schema(resolver, request_body)?,
        None => None,
    };
    let streaming = id == "stream" || declares_ndjson(resolver, raw)?;

    Ok(tags
        .into_iter()
        .map(|resource| Operation {
            id: id.clone(),
            resource,
            method,
            path: path.to_string(),
            path_parameters: path_parameters.clone(),
            query_parameters: query_parameters.clone(),
            header_parameters: header_parameters.clone(),
            security_schemes: security_schemes.clone(),
            body: body.clone(),
            streaming,
        })
        .collect())
}

/// Merges path-level and operation-level parameters; an operation-level
/// parameter replaces a path-level one with the same name and location.
fn collect_parameters(
    resolver: &RefResolver<'_>,
    operation: &str,
    shared: Option<&Value>,
    own: Option<&Value>,
) -> Result<Vec<Parameter>, ConfigError> {
    let mut out: Vec<Parameter> = Vec::new();
    let declared = [shared, own]
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten();

    for raw in declared {
        let raw = resolver.inline(raw)?;
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ConfigError::invalid_document(format!("parameter of {operation} has no name"))
            })?
            .to_string();
        let location_name = raw.get("in").and_then(Value::as_str).unwrap_or_default();
        let location = location_name.parse::<ParameterLocation>().map_err(|_| {
            ConfigError::UnsupportedParameterLocation {
                operation: operation.to_string(),
                parameter: name.clone(),
                location: location_name.to_string(),
            }
        })?;
        let schema = match raw.get("schema") {
            Some(schema) => SchemaNode::from_json(schema)?,
            None => SchemaNode::default(),
        };
        let required = location == ParameterLocation::Path
            || raw.get("required").and_then(Value::as_bool).unwrap_or(false);

        let parameter = Parameter {
            name,
            location,
            required,
            schema,
        };
        match out
            .iter_mut()
            .find(|p| p.name == parameter.name && p.location == parameter.location)
        {
            Some(existing) => *existing = parameter,
            None => out.push(parameter),
        }
    }
    Ok(out)
}

fn request_body_schema(
    resolver: &RefResolver<'_>,
    request_body: &Value,
) -> Result<Option<RequestBodySchema>, ConfigError> {
    let request_body = resolver.inline(request_body)?;
    let required = request_body
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let Some((content_type, media)) = request_body
        .get("content")
        .and_then(Value::as_object)
        .and_then(|content| content.iter().next())
    else {
        return Ok(None);
    };
    let schema = match media.get("schema") {
        Some(schema) => SchemaNode::from_json(schema)?,
        None => SchemaNode::default(),
    };
    Ok(Some(RequestBodySchema {
        content_type: content_type.clone(),
        required,
        schema,
    }))
}

fn declares_ndjson(resolver: &RefResolver<'_>, raw: &Value) -> Result<bool, ConfigError> {
    let Some(responses) = raw.get("responses").and_then(Value::as_object) else {
        return Ok(false);
    };
    for (status, response) in responses {
        if !(status.starts_with('2') || status == "default") {
            continue;
        }
        let response = resolver.follow(response)?;
        let streams = response
            .get("content")
            .and_then(Value::as_object)
            .is_some_and(|content| {
                content
                    .keys()
                    .any(|media| media.split(';').next().is_some_and(|m| m.trim() == NDJSON))
            });
        if streams {
            return Ok(true);
        }
    }
    Ok(false)
}

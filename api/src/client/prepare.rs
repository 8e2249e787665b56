//! Splits a caller's body into path, query, header and body parts.
//!
//! Everything here happens before the first byte goes on the wire, so
//! every input problem surfaces as a [`RequestError`] without any network
//! I/O.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::casing::normalize_key;
use crate::contract::{Operation, Parameter, SchemeLocation, SecuritySchemeRegistry};
use crate::diagnostics::Diagnostic;
use crate::error::{ApiError, ConfigError, RequestError};
use crate::mapping::PropertyMapper;
use crate::serialize::{serialize_body, WireBody};
use crate::validate::{ValidationFailure, Validator};
use crate::value::BodyValue;

/// The request parts of one call.
#[derive(Debug)]
pub(crate) struct PreparedRequest {
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<WireBody>,
}

pub(crate) struct RequestPreparer<'a> {
    pub(crate) validator: &'a Validator,
    pub(crate) mapper: &'a PropertyMapper,
    pub(crate) security: &'a SecuritySchemeRegistry,
    pub(crate) credentials: &'a HashMap<String, String>,
}

impl RequestPreparer<'_> {
    pub(crate) async fn prepare(
        &self,
        operation: &Operation,
        body: BodyValue,
    ) -> Result<PreparedRequest, ApiError> {
        let supplied = !body.is_null();
        let mut body = body;

        let mut path_values = HashMap::new();
        for parameter in operation.path_parameters() {
            let value = self.parameter_value(operation, parameter, &mut body).await?;
            let Some(value) = value else {
                return Err(missing(operation, parameter).into());
            };
            let text = render(operation, parameter, &value)?;
            path_values.insert(parameter.name.clone(), text);
        }

        let mut query = Vec::new();
        for parameter in operation.query_parameters() {
            match self.parameter_value(operation, parameter, &mut body).await? {
                Some(BodyValue::Array(items)) => {
                    for item in &items {
                        query.push((parameter.name.clone(), render(operation, parameter, item)?));
                    }
                }
                Some(value) => {
                    query.push((parameter.name.clone(), render(operation, parameter, &value)?));
                }
                None => {}
            }
        }

        let mut headers = HeaderMap::new();
        for parameter in operation.header_parameters() {
            let Some(value) = self.parameter_value(operation, parameter, &mut body).await? else {
                continue;
            };
            let text = match &value {
                BodyValue::Array(items) => items
                    .iter()
                    .map(|item| render(operation, parameter, item))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(","),
                other => render(operation, parameter, other)?,
            };
            let value = HeaderValue::try_from(text).map_err(|_| {
                invalid(
                    operation,
                    parameter,
                    format!("`{}` is not a valid header value", normalize_key(&parameter.name)),
                )
            })?;
            headers.insert(header_name(&parameter.name)?, value);
        }
        self.apply_security(operation, &mut headers)?;

        let body = match operation.body() {
            None => {
                self.report_unused(&body);
                None
            }
            Some(declared) if !supplied => {
                if declared.required {
                    return Err(RequestError::MissingBody {
                        operation: operation.qualified_name(),
                    }
                    .into());
                }
                None
            }
            Some(declared) => {
                self.validator
                    .validate_property(&declared.schema, Some(&body), "body")
                    .into_result()
                    .map_err(|failure| RequestError::InvalidBody {
                        operation: operation.qualified_name(),
                        failure,
                    })?;
                let mapped = self
                    .mapper
                    .map(&declared.schema, Some(body))
                    .await
                    .map_err(RequestError::from)?;
                match mapped {
                    Some(value) => serialize_body(&declared.content_type, value)
                        .await
                        .map_err(RequestError::from)?,
                    None => None,
                }
            }
        };

        Ok(PreparedRequest {
            path: operation.render_path(&path_values),
            query,
            headers,
            body,
        })
    }

    /// Pulls a parameter out of the body, validated and mapped.
    ///
    /// The field stays in the body when the body schema declares it too.
    /// `None` means the parameter is optional, absent and has no default.
    async fn parameter_value(
        &self,
        operation: &Operation,
        parameter: &Parameter,
        body: &mut BodyValue,
    ) -> Result<Option<BodyValue>, ApiError> {
        let keep = operation.body_declares(&parameter.name);
        let value = take_field(body, &parameter.name, keep).filter(|v| !v.is_null());

        if value.is_none() {
            if parameter.schema.default.is_none() {
                if parameter.required {
                    return Err(missing(operation, parameter).into());
                }
                return Ok(None);
            }
        } else {
            self.validator
                .validate_property(&parameter.schema, value.as_ref(), &parameter.name)
                .into_result()
                .map_err(|failure| RequestError::InvalidParameter {
                    operation: operation.qualified_name(),
                    parameter: normalize_key(&parameter.name),
                    location: parameter.location,
                    failure,
                })?;
        }

        let mapped = self
            .mapper
            .map_property(&parameter.schema, value, &parameter.name)
            .await
            .map_err(RequestError::from)?;
        Ok(mapped.filter(|v| !v.is_null()))
    }

    fn apply_security(&self, operation: &Operation, headers: &mut HeaderMap) -> Result<(), ApiError> {
        for name in operation.security_schemes() {
            let Some(scheme) = self.security.get(name) else {
                debug!(scheme = %name, "security scheme is not declared, skipping");
                continue;
            };
            if scheme.location != SchemeLocation::Header {
                debug!(scheme = %name, location = %scheme.location, "only header credentials are sent");
                continue;
            }
            let Some(credential) = self.credentials.get(name) else {
                debug!(scheme = %name, "no credential configured");
                continue;
            };
            let value = HeaderValue::try_from(scheme.carrier_value(credential))
                .map_err(|e| ConfigError::invalid_header(format!("credential for {name}: {e}")))?;
            headers.insert(header_name(&scheme.carrier)?, value);
        }
        Ok(())
    }

    fn report_unused(&self, body: &BodyValue) {
        let Some(members) = body.as_object() else {
            return;
        };
        for property in members.keys() {
            self.mapper.sink().emit(Diagnostic::UnsupportedProperty {
                property: normalize_key(property),
                path: "body".to_string(),
            });
        }
    }
}

/// Finds a body member by normalized name; removes it unless `keep`.
fn take_field(body: &mut BodyValue, name: &str, keep: bool) -> Option<BodyValue> {
    let members = body.as_object_mut()?;
    let wanted = normalize_key(name);
    let key = members.keys().find(|k| normalize_key(k) == wanted)?.clone();
    if keep {
        members.get(&key).cloned()
    } else {
        members.remove(&key)
    }
}

fn render(operation: &Operation, parameter: &Parameter, value: &BodyValue) -> Result<String, RequestError> {
    value.render_text().ok_or_else(|| {
        invalid(
            operation,
            parameter,
            format!(
                "`{}` cannot be sent as text ({})",
                normalize_key(&parameter.name),
                value.type_name()
            ),
        )
    })
}

fn header_name(name: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::try_from(name).map_err(|e| ConfigError::invalid_header(format!("{name}: {e}")))
}

fn missing(operation: &Operation, parameter: &Parameter) -> RequestError {
    RequestError::MissingParameter {
        operation: operation.qualified_name(),
        parameter: normalize_key(&parameter.name),
        location: parameter.location,
    }
}

fn invalid(operation: &Operation, parameter: &Parameter, message: String) -> RequestError {
    RequestError::InvalidParameter {
        operation: operation.qualified_name(),
        parameter: normalize_key(&parameter.name),
        location: parameter.location,
        failure: ValidationFailure::new(message),
    }
}

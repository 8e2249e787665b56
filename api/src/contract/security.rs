//! Security schemes declared under `components.securitySchemes`.

use std::collections::BTreeMap;

use serde_json::Value;
use strum::{Display, EnumString};
use tracing::debug;

use crate::error::ConfigError;

/// Where a credential is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SchemeLocation {
    Header,
    Query,
    Cookie,
}

/// How to attach one credential to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityScheme {
    /// Where the credential goes.
    pub location: SchemeLocation,
    /// Header, query parameter or cookie name.
    pub carrier: String,
    /// Text placed before the credential (`Bearer `).
    pub prefix: Option<String>,
}

impl SecurityScheme {
    /// Renders the carrier value for a credential.
    pub fn carrier_value(&self, credential: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{credential}"),
            None => credential.to_string(),
        }
    }

    fn authorization(prefix: &str) -> Self {
        Self {
            location: SchemeLocation::Header,
            carrier: "Authorization".to_string(),
            prefix: Some(format!("{prefix} ")),
        }
    }
}

/// Scheme name to [`SecurityScheme`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecuritySchemeRegistry {
    schemes: BTreeMap<String, SecurityScheme>,
}

impl SecuritySchemeRegistry {
    /// Reads the `securitySchemes` object of a (merged) document.
    ///
    /// Scheme types the runtime cannot attach are skipped.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::InvalidDocument`] if an `apiKey` scheme has no
    /// `name` or an unknown `in`.
    pub fn from_document(document: &Value) -> Result<Self, ConfigError> {
        let Some(declared) = document
            .pointer("/components/securitySchemes")
            .and_then(Value::as_object)
        else {
            return Ok(Self::default());
        };

        let mut schemes = BTreeMap::new();
        for (name, scheme) in declared {
            let kind = scheme.get("type").and_then(Value::as_str).unwrap_or_default();
            let parsed = match kind {
                "apiKey" => {
                    let location = scheme
                        .get("in")
                        .and_then(Value::as_str)
                        .and_then(|s| s.parse::<SchemeLocation>().ok())
                        .ok_or_else(|| {
                            ConfigError::invalid_document(format!(
                                "security scheme {name} has no valid `in`"
                            ))
                        })?;
                    let carrier = scheme
                        .get("name")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            ConfigError::invalid_document(format!(
                                "security scheme {name} has no `name`"
                            ))
                        })?;
                    SecurityScheme {
                        location,
                        carrier: carrier.to_string(),
                        prefix: None,
                    }
                }
                "http" => match scheme
                    .get("scheme")
                    .and_then(Value::as_str)
                    .map(str::to_ascii_lowercase)
                    .as_deref()
                {
                    Some("basic") => SecurityScheme::authorization("Basic"),
                    Some("bearer") | None => SecurityScheme::authorization("Bearer"),
                    Some(other) => SecurityScheme::authorization(other),
                },
                "oauth2" | "openIdConnect" => SecurityScheme::authorization("Bearer"),
                other => {
                    debug!(scheme = %name, kind = %other, "skipping unsupported security scheme");
                    continue;
                }
            };
            schemes.insert(name.clone(), parsed);
        }
        Ok(Self { schemes })
    }

    /// Looks up a scheme by its declared name.
    pub fn get(&self, name: &str) -> Option<&SecurityScheme> {
        self.schemes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SecurityScheme)> {
        self.schemes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}

//! HTTP verbs of contract operations.

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// HTTP verb of an operation.
///
/// Path items in a contract key their operations by lower-case verb
/// (`get`, `post`, ...); parsing is case-insensitive so both spellings
/// work.
///
/// ## Examples
///
/// ```rust
/// use api_runtime::RestMethod;
///
/// let parsed: RestMethod = "post".parse().unwrap();
/// assert_eq!(parsed, RestMethod::Post);
/// assert_eq!(parsed.to_string(), "POST");
/// assert!(parsed.has_body());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl RestMethod {
    /// Returns `true` if this verb usually carries a request body.
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    /// Looks up the verb for a path-item key.
    ///
    /// Returns `None` for the non-operation keys a path item may hold
    /// (`parameters`, `summary`, `servers`, extensions, ...).
    pub fn from_path_item_key(key: &str) -> Option<Self> {
        Self::iter().find(|m| m.to_string().eq_ignore_ascii_case(key))
    }

    /// Converts to the equivalent `reqwest::Method`.
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
            Self::Trace => reqwest::Method::TRACE,
        }
    }
}

impl From<RestMethod> for reqwest::Method {
    fn from(method: RestMethod) -> Self {
        method.to_reqwest()
    }
}

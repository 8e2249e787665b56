//! Client configuration and per-call options.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use super::cancel::CancelToken;
use super::retry::{RetryPolicy, RetryStrategy};
use crate::casing::normalize_key;
use crate::diagnostics::{DiagnosticSink, TracingSink};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the client version marker.
pub const VERSION_HEADER: &str = "x-client-version";

/// Value of the client version marker.
pub const CLIENT_VERSION: &str = concat!("api-runtime/", env!("CARGO_PKG_VERSION"));

/// Idle keep-alive connections kept per host.
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Fetch the current object before sending `resource.operation`.
///
/// The object is read with the resource's `get` operation using only
/// `id_field` from the caller's body; the caller's fields are then laid
/// over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchBeforeSend {
    pub resource: String,
    pub operation: String,
    pub id_field: String,
}

impl FetchBeforeSend {
    pub fn new(
        resource: impl AsRef<str>,
        operation: impl AsRef<str>,
        id_field: impl AsRef<str>,
    ) -> Self {
        Self {
            resource: normalize_key(resource.as_ref()),
            operation: normalize_key(operation.as_ref()),
            id_field: normalize_key(id_field.as_ref()),
        }
    }

    pub(crate) fn applies_to(&self, resource: &str, operation: &str) -> bool {
        self.resource == resource && self.operation == operation
    }
}

/// Settings fixed when an [`ApiClient`](super::ApiClient) is built.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    /// Sent with every request, the version marker included.
    pub default_headers: HeaderMap,
    /// Credential per security-scheme name.
    pub credentials: HashMap<String, String>,
    pub retry: RetryPolicy,
    pub fetch_before_send: Vec<FetchBeforeSend>,
    /// Receives diagnostics unless a call overrides it.
    pub diagnostics: Arc<dyn DiagnosticSink>,
    pub pool_max_idle_per_host: usize,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the base URL.
    pub fn new(base_url: Url) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            HeaderName::from_static(VERSION_HEADER),
            HeaderValue::from_static(CLIENT_VERSION),
        );
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            default_headers,
            credentials: HashMap::new(),
            retry: RetryPolicy::default(),
            fetch_before_send: Vec::new(),
            diagnostics: Arc::new(TracingSink),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
        }
    }

    pub(crate) fn fetch_rule(&self, resource: &str, operation: &str) -> Option<&FetchBeforeSend> {
        self.fetch_before_send
            .iter()
            .find(|rule| rule.applies_to(resource, operation))
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // credential values stay out of logs
        let mut schemes: Vec<&str> = self.credentials.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("default_headers", &self.default_headers)
            .field("credentials", &schemes)
            .field("retry", &self.retry)
            .field("fetch_before_send", &self.fetch_before_send)
            .field("diagnostics", &self.diagnostics)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .finish()
    }
}

/// Per-call overrides.
///
/// ## Examples
///
/// ```
/// use api_runtime::client::{CancelToken, RetryStrategy, RunOptions};
///
/// let token = CancelToken::new();
/// let options = RunOptions::new()
///     .retry_strategy(RetryStrategy::Disabled)
///     .cancel_token(token.clone());
/// assert!(options.cancel.is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub retry_strategy: Option<RetryStrategy>,
    pub max_attempts: Option<u32>,
    pub cancel: Option<CancelToken>,
    pub diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// The client's policy with this call's overrides applied.
    pub(crate) fn retry_policy(&self, base: &RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            strategy: self.retry_strategy.unwrap_or(base.strategy),
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            ..base.clone()
        }
    }

    pub(crate) fn sink<'a>(&'a self, config: &'a ClientConfig) -> &'a Arc<dyn DiagnosticSink> {
        self.diagnostics.as_ref().unwrap_or(&config.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new(Url::parse("https://api.example.com").unwrap())
    }

    #[test]
    fn test_version_marker_is_a_default_header() {
        let config = config();
        let marker = config.default_headers.get(VERSION_HEADER).unwrap();
        assert!(marker.to_str().unwrap().starts_with("api-runtime/"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.attempts(), 5);
    }

    #[test]
    fn test_debug_hides_credentials() {
        let mut config = config();
        config
            .credentials
            .insert("ApiKeyAuth".to_string(), "secret-key".to_string());
        let debug = format!("{config:?}");
        assert!(debug.contains("ApiKeyAuth"));
        assert!(!debug.contains("secret-key"));
    }

    #[test]
    fn test_fetch_rule_names_are_normalized() {
        let mut config = config();
        config
            .fetch_before_send
            .push(FetchBeforeSend::new("Advertiser", "Update", "advertiser_id"));
        let rule = config.fetch_rule("advertiser", "update").unwrap();
        assert_eq!(rule.id_field, "advertiserId");
        assert!(config.fetch_rule("advertiser", "get").is_none());
    }

    #[test]
    fn test_run_options_override_retry() {
        let base = RetryPolicy::default();
        let policy = RunOptions::new().max_attempts(2).retry_policy(&base);
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.strategy, base.strategy);

        let disabled = RunOptions::new()
            .retry_strategy(RetryStrategy::Disabled)
            .retry_policy(&base);
        assert_eq!(disabled.attempts(), 1);
    }
}

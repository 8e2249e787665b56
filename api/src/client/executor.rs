//! Request execution with tracing instrumentation.
//!
//! This module provides the [`ApiClient`] struct, which runs catalog
//! operations: it prepares the request from the caller's body, sends it
//! with 429 backoff and decodes the response.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument, Span};
use url::Url;

use super::cancel::run_cancellable;
use super::config::{ClientConfig, FetchBeforeSend, RunOptions, VERSION_HEADER};
use super::prepare::{PreparedRequest, RequestPreparer};
use super::retry::{send_with_retry, RetryPolicy, RetryStrategy};
use crate::casing::normalize_key;
use crate::contract::{ContractCatalog, Operation, ParameterLocation};
use crate::diagnostics::DiagnosticSink;
use crate::error::{ApiError, ClientError, ConfigError, RequestError, ResponseError};
use crate::mapping::PropertyMapper;
use crate::response::{decode_json, decode_stream, error_body_from, RunResult};
use crate::validate::Validator;
use crate::value::{BodyMap, BodyValue};

/// Operation used to read the current object for fetch-before-send.
const FETCH_OPERATION: &str = "get";

/// Builder for configuring an [`ApiClient`].
#[derive(Debug)]
pub struct ApiClientBuilder {
    catalog: Arc<ContractCatalog>,
    config: ClientConfig,
}

impl ApiClientBuilder {
    fn new(catalog: Arc<ContractCatalog>, base_url: Url) -> Self {
        Self {
            catalog,
            config: ClientConfig::new(base_url),
        }
    }

    /// Sets the request timeout.
    ///
    /// Ordinary operations must complete within it. Streaming operations
    /// only fail when no data arrives for this long.
    ///
    /// ## Examples
    ///
    /// ```rust,ignore
    /// use std::time::Duration;
    ///
    /// let client = ApiClient::builder(catalog, base_url)
    ///     .timeout(Duration::from_secs(60))
    ///     .build()?;
    /// ```
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Adds a default header to all requests.
    ///
    /// ## Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, ApiError> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| ConfigError::invalid_header(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| ConfigError::invalid_header(format!("invalid header value: {e}")))?;
        self.config.default_headers.insert(name, value);
        Ok(self)
    }

    /// Replaces the value of the client version marker header.
    ///
    /// ## Errors
    ///
    /// Returns an error if the value is not a valid header value.
    pub fn version_marker(self, value: impl AsRef<str>) -> Result<Self, ApiError> {
        self.default_header(VERSION_HEADER, value)
    }

    /// Sets the credential sent for a security scheme.
    ///
    /// ## Examples
    ///
    /// ```rust,ignore
    /// let client = ApiClient::builder(catalog, base_url)
    ///     .credential("ApiKeyAuth", std::env::var("API_KEY")?)
    ///     .build()?;
    /// ```
    pub fn credential(mut self, scheme: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.credentials.insert(scheme.into(), value.into());
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.config.retry.strategy = strategy;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    /// Reads the current object before every `resource.operation` call and
    /// sends it with the caller's fields laid over it.
    pub fn fetch_before_send(
        mut self,
        resource: impl AsRef<str>,
        operation: impl AsRef<str>,
        id_field: impl AsRef<str>,
    ) -> Self {
        self.config
            .fetch_before_send
            .push(FetchBeforeSend::new(resource, operation, id_field));
        self
    }

    /// Sets where diagnostics go when a call does not override it.
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.config.diagnostics = sink;
        self
    }

    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Builds the [`ApiClient`].
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        ApiClient::from_config(self.catalog, self.config)
    }
}

/// Async HTTP client that runs the operations of a [`ContractCatalog`].
///
/// The client is `Send + Sync`; share it by reference or `Arc`. Its
/// connection pool is reused across calls.
///
/// ## Examples
///
/// ```rust,ignore
/// use api_runtime::{ApiClient, ContractCatalog, RunOptions};
/// use serde_json::json;
/// use url::Url;
///
/// let catalog = ContractCatalog::from_yaml_documents([include_str!("advertiser.yaml")])?;
/// let client = ApiClient::builder(catalog, Url::parse("https://api.example.com")?)
///     .credential("ApiKeyAuth", "sk-xxx")
///     .build()?;
///
/// let created = client
///     .run("advertiser", "create", json!({ "title": "Acme" }), &RunOptions::default())
///     .await?;
/// println!("{}", created.into_json());
/// ```
#[derive(Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    catalog: Arc<ContractCatalog>,
    config: ClientConfig,
    validator: Validator,
}

impl ApiClient {
    /// Creates a new builder for configuring an API client.
    ///
    /// ## Arguments
    ///
    /// * `catalog` - The operations this client can run.
    /// * `base_url` - Prefix of every request URL.
    pub fn builder(catalog: impl Into<Arc<ContractCatalog>>, base_url: Url) -> ApiClientBuilder {
        ApiClientBuilder::new(catalog.into(), base_url)
    }

    /// Creates a new API client with default settings.
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(catalog: impl Into<Arc<ContractCatalog>>, base_url: Url) -> Result<Self, ApiError> {
        Self::builder(catalog, base_url).build()
    }

    /// Creates a client from a complete configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(
        catalog: impl Into<Arc<ContractCatalog>>,
        config: ClientConfig,
    ) -> Result<Self, ApiError> {
        // the total timeout is set per request; streams are only bounded
        // by the idle gap between reads
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .default_headers(config.default_headers.clone())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self {
            client,
            catalog: catalog.into(),
            config,
            validator: Validator::new(),
        })
    }

    /// Returns the base URL for this client.
    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    pub fn catalog(&self) -> &ContractCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Runs one operation and decodes its response.
    ///
    /// Streaming operations produce [`RunResult::Records`]; others produce
    /// [`RunResult::Json`], or [`RunResult::Empty`] for 204 and empty
    /// bodies.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The resource or operation is unknown
    /// - The body or a parameter is missing or invalid (before any I/O)
    /// - Every attempt was rate limited, or the server returned another
    ///   non-success status
    /// - The request fails (network, timeout, cancellation)
    #[instrument(
        name = "api_request",
        skip(self, body, options),
        fields(
            http.method = tracing::field::Empty,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            retry.attempt = tracing::field::Empty,
            otel.kind = "client",
            otel.status_code = tracing::field::Empty,
        )
    )]
    pub async fn run(
        &self,
        resource: &str,
        operation: &str,
        body: impl Into<BodyValue>,
        options: &RunOptions,
    ) -> Result<RunResult, ApiError> {
        let work = self.run_unguarded(resource, operation, body.into(), options);
        run_cancellable(options.cancel.as_ref(), work).await
    }

    /// Runs one operation and folds its response into an accumulator.
    ///
    /// For streaming operations `fold` sees every record in arrival order.
    /// Otherwise it sees the single decoded document, or nothing for an
    /// empty response.
    ///
    /// ## Examples
    ///
    /// ```rust,ignore
    /// let impressions = client
    ///     .run_folded("report", "stream", query, &RunOptions::default(), 0u64, |total, record| {
    ///         total + record["impressions"].as_u64().unwrap_or(0)
    ///     })
    ///     .await?;
    /// ```
    ///
    /// ## Errors
    ///
    /// As for [`run`](Self::run); a failing stream discards the partial
    /// accumulator.
    #[instrument(
        name = "api_request",
        skip(self, body, options, initial, fold),
        fields(
            http.method = tracing::field::Empty,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            retry.attempt = tracing::field::Empty,
            otel.kind = "client",
            otel.status_code = tracing::field::Empty,
        )
    )]
    pub async fn run_folded<A, F>(
        &self,
        resource: &str,
        operation: &str,
        body: impl Into<BodyValue>,
        options: &RunOptions,
        initial: A,
        fold: F,
    ) -> Result<A, ApiError>
    where
        F: FnMut(A, Value) -> A,
    {
        let work = self.run_folded_unguarded(resource, operation, body.into(), options, initial, fold);
        run_cancellable(options.cancel.as_ref(), work).await
    }

    async fn run_unguarded(
        &self,
        resource: &str,
        operation: &str,
        body: BodyValue,
        options: &RunOptions,
    ) -> Result<RunResult, ApiError> {
        let operation = self.catalog.operation(resource, operation)?;
        let response = self.execute(operation, body, options).await?;
        let sink = Arc::clone(options.sink(&self.config));

        if operation.is_streaming() {
            let records = self
                .fold_response(operation, response, sink, Vec::new(), |mut records, record| {
                    records.push(record);
                    records
                })
                .await?;
            return Ok(RunResult::Records(records));
        }
        self.fold_response(operation, response, sink, RunResult::Empty, |_, document| {
            RunResult::Json(document)
        })
        .await
    }

    async fn run_folded_unguarded<A, F>(
        &self,
        resource: &str,
        operation: &str,
        body: BodyValue,
        options: &RunOptions,
        initial: A,
        fold: F,
    ) -> Result<A, ApiError>
    where
        F: FnMut(A, Value) -> A,
    {
        let operation = self.catalog.operation(resource, operation)?;
        let response = self.execute(operation, body, options).await?;
        let sink = Arc::clone(options.sink(&self.config));
        self.fold_response(operation, response, sink, initial, fold)
            .await
    }

    /// Applies fetch-before-send, then exchanges the request.
    async fn execute(
        &self,
        operation: &Operation,
        body: BodyValue,
        options: &RunOptions,
    ) -> Result<reqwest::Response, ApiError> {
        let body = match self.config.fetch_rule(operation.resource(), operation.id()) {
            Some(rule) => self.fetch_current(operation, rule, body, options).await?,
            None => body,
        };
        self.exchange(operation, body, options).await
    }

    /// Reads the current object and lays the caller's fields over it.
    async fn fetch_current(
        &self,
        operation: &Operation,
        rule: &FetchBeforeSend,
        body: BodyValue,
        options: &RunOptions,
    ) -> Result<BodyValue, ApiError> {
        let id = body
            .as_object()
            .and_then(|fields| {
                fields
                    .iter()
                    .find(|(key, _)| normalize_key(key) == rule.id_field)
            })
            .map(|(_, value)| value.clone())
            .filter(|value| !value.is_null())
            .ok_or_else(|| RequestError::MissingParameter {
                operation: operation.qualified_name(),
                parameter: rule.id_field.clone(),
                location: ParameterLocation::Path,
            })?;

        let get = self.catalog.operation(operation.resource(), FETCH_OPERATION)?;
        debug!(
            operation = %operation.qualified_name(),
            id_field = %rule.id_field,
            "fetching current object before send"
        );
        let lookup = BodyValue::Object(BodyMap::from([(rule.id_field.clone(), id)]));
        let response = self.exchange(get, lookup, options).await?;
        let current = match response.status() {
            StatusCode::NO_CONTENT => None,
            _ => decode_json(&self.read_body(response).await?)?,
        };

        let mut merged: BodyMap = match current {
            Some(Value::Object(fields)) => fields
                .into_iter()
                .map(|(key, value)| (key, BodyValue::from(value)))
                .collect(),
            _ => BodyMap::new(),
        };
        if let BodyValue::Object(fields) = body {
            for (key, value) in fields {
                merged.remove(&normalize_key(&key));
                merged.insert(key, value);
            }
        }
        Ok(BodyValue::Object(merged))
    }

    /// Prepares, sends (with 429 backoff) and status-checks one request.
    async fn exchange(
        &self,
        operation: &Operation,
        body: BodyValue,
        options: &RunOptions,
    ) -> Result<reqwest::Response, ApiError> {
        let mapper = PropertyMapper::new(Arc::clone(options.sink(&self.config)));
        let preparer = RequestPreparer {
            validator: &self.validator,
            mapper: &mapper,
            security: self.catalog.security_schemes(),
            credentials: &self.config.credentials,
        };
        let prepared = preparer.prepare(operation, body).await?;
        let url = self.endpoint_url(&prepared.path)?;

        // Record the method and URL in the span
        Span::current().record("http.method", operation.method().to_string().as_str());
        Span::current().record("http.url", url.as_str());

        let policy = options.retry_policy(&self.config.retry);
        let (url, prepared) = (&url, &prepared);
        let response = send_with_retry(&policy, &operation.qualified_name(), move || {
            self.send(operation, url, prepared)
        })
        .await?;

        let status = response.status();
        Span::current().record("http.status_code", status.as_u16());

        if !status.is_success() {
            let otel_status = if status.is_server_error() {
                "ERROR"
            } else {
                "UNSET"
            };
            Span::current().record("otel.status_code", otel_status);

            let body = error_body_from(response.bytes().await);
            return Err(ResponseError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Span::current().record("otel.status_code", "OK");
        Ok(response)
    }

    /// Sends one attempt.
    async fn send(
        &self,
        operation: &Operation,
        url: &Url,
        prepared: &PreparedRequest,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self
            .client
            .request(operation.method().to_reqwest(), url.clone())
            .headers(prepared.headers.clone());
        if !operation.is_streaming() {
            request = request.timeout(self.config.timeout);
        }
        if !prepared.query.is_empty() {
            request = request.query(&prepared.query);
        }
        if let Some(body) = &prepared.body {
            request = body.apply(request).map_err(ClientError::Request)?;
        }

        request
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.timeout_ms()).into())
    }

    async fn fold_response<A, F>(
        &self,
        operation: &Operation,
        response: reqwest::Response,
        sink: Arc<dyn DiagnosticSink>,
        initial: A,
        mut fold: F,
    ) -> Result<A, ApiError>
    where
        F: FnMut(A, Value) -> A,
    {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(initial);
        }
        if operation.is_streaming() {
            return Ok(decode_stream(response.bytes_stream(), initial, fold, sink).await?);
        }
        match decode_json(&self.read_body(response).await?)? {
            Some(document) => Ok(fold(initial, document)),
            None => Ok(initial),
        }
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<bytes::Bytes, ApiError> {
        response
            .bytes()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.timeout_ms()).into())
    }

    /// Base URL followed by the rendered path.
    fn endpoint_url(&self, path: &str) -> Result<Url, ConfigError> {
        let base = self.config.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

//! Contract-driven REST client runtime.
//!
//! Operations are described by OpenAPI documents rather than generated
//! code. A [`ContractCatalog`] is built from one or more documents; an
//! [`ApiClient`] then runs any of its operations from a dynamic
//! [`BodyValue`]: parameters are pulled out of the body, the body is
//! validated against its schema, mapped to wire form and serialized, and
//! the response is decoded with its keys normalized to lower camel case.
//!
//! ## Core Types
//!
//! - [`ContractCatalog`] - Operations by resource, built from OpenAPI documents
//! - [`ApiClient`] - Runs operations, with 429 backoff and cancellation
//! - [`BodyValue`] - Caller-supplied values, binary content included
//! - [`RunResult`] - A decoded response
//!
//! ## Building Blocks
//!
//! - [`Validator`] - Schema validation with nested diagnostics
//! - [`PropertyMapper`] - Renames, defaults and date rendering
//! - [`serialize_body`] - JSON, form and multipart encoders
//! - [`decode_stream`] - Folds NDJSON responses record by record
//! - [`DiagnosticSink`] - Receives non-fatal warnings
//!
//! ## Examples
//!
//! ```rust,ignore
//! use api_runtime::{ApiClient, ContractCatalog, RunOptions};
//! use serde_json::json;
//! use url::Url;
//!
//! let catalog = ContractCatalog::from_yaml_documents([
//!     std::fs::read_to_string("openapi/advertiser.yaml")?,
//!     std::fs::read_to_string("openapi/campaign.yaml")?,
//! ])?;
//! let client = ApiClient::builder(catalog, Url::parse("https://api.example.com/v1")?)
//!     .credential("ApiKeyAuth", std::env::var("API_KEY")?)
//!     .fetch_before_send("advertiser", "update", "id")
//!     .build()?;
//!
//! let advertiser = client
//!     .run("advertiser", "update", json!({ "id": 5, "title": "Acme" }), &RunOptions::default())
//!     .await?;
//! ```

pub mod casing;
pub mod client;
pub mod contract;
mod datetime;
pub mod diagnostics;
pub mod error;
pub mod mapping;
pub mod method;
pub mod response;
pub mod schema;
pub mod serialize;
pub mod validate;
pub mod value;

pub use client::{
    ApiClient, ApiClientBuilder, CancelToken, ClientConfig, RetryPolicy, RetryStrategy, RunOptions,
};
pub use contract::{ContractCatalog, Operation, Parameter, ParameterLocation};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, TracingSink};
pub use error::ApiError;
pub use mapping::PropertyMapper;
pub use method::RestMethod;
pub use response::{decode_stream, RunResult};
pub use schema::SchemaNode;
pub use serialize::{serialize_body, WireBody};
pub use validate::{ValidationFailure, ValidationOutcome, Validator};
pub use value::{BinaryPayload, BodyValue};

//! Running catalog operations over HTTP.
//!
//! - [`ApiClient`] / [`ApiClientBuilder`] - the client and its builder
//! - [`ClientConfig`] / [`RunOptions`] - fixed settings and per-call overrides
//! - [`RetryPolicy`] - backoff on 429 responses
//! - [`CancelToken`] - aborts in-flight calls

mod cancel;
mod config;
mod executor;
mod prepare;
mod retry;

pub use cancel::CancelToken;
pub use config::{
    ClientConfig, FetchBeforeSend, RunOptions, CLIENT_VERSION, DEFAULT_POOL_MAX_IDLE_PER_HOST,
    DEFAULT_TIMEOUT, VERSION_HEADER,
};
pub use executor::{ApiClient, ApiClientBuilder};
pub use retry::{
    RetryPolicy, RetryStrategy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};

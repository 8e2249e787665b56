//! Backoff on rate-limited (429) responses.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{warn, Span};

use crate::error::{ApiError, ResponseError};
use crate::response::error_body_from;

/// Default number of attempts, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Upper bound on any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
/// Growth factor between consecutive delays.
const RETRY_MULTIPLIER: u32 = 2;

/// How 429 responses are retried.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RetryStrategy {
    /// One attempt; a 429 is returned as [`ResponseError::RateLimited`].
    Disabled,
    /// Delays double from the base delay up to the maximum.
    Exponential,
    /// Like `Exponential`, with each delay drawn from its upper half.
    #[default]
    ExponentialJitter,
}

/// Retry settings; deserializable so they can live in a config file.
///
/// ## Examples
///
/// ```
/// use api_runtime::client::{RetryPolicy, RetryStrategy};
///
/// let policy: RetryPolicy = serde_json::from_str(
///     r#"{ "strategy": "exponential", "max_attempts": 3 }"#,
/// ).unwrap();
/// assert_eq!(policy.strategy, RetryStrategy::Exponential);
/// assert_eq!(policy.attempts(), 3);
/// assert_eq!(policy.base_delay_ms, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub strategy: RetryStrategy,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            max_delay_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            strategy: RetryStrategy::Disabled,
            ..Self::default()
        }
    }

    /// Total attempts this policy allows, never less than one.
    pub fn attempts(&self) -> u32 {
        match self.strategy {
            RetryStrategy::Disabled => 1,
            _ => self.max_attempts.max(1),
        }
    }

    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        let ceiling = self
            .base_delay_ms
            .saturating_mul(u64::from(RETRY_MULTIPLIER.pow(exponent)))
            .min(self.max_delay_ms);
        let millis = match self.strategy {
            RetryStrategy::ExponentialJitter => {
                let half = ceiling / 2;
                ceiling - half + rand::thread_rng().gen_range(0..=half)
            }
            _ => ceiling,
        };
        Duration::from_millis(millis)
    }
}

/// Sends until the response is not a 429 or the attempts run out.
///
/// `send` is called once per attempt and must build a fresh request.
pub(crate) async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut send: F,
) -> Result<reqwest::Response, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, ApiError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        attempt += 1;
        Span::current().record("retry.attempt", attempt);

        let response = send().await?;
        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return Ok(response);
        }
        if attempt >= attempts {
            let body = error_body_from(response.bytes().await);
            return Err(ResponseError::RateLimited {
                attempts: attempt,
                body,
            }
            .into());
        }

        let delay = policy.delay_for(attempt);
        warn!(
            "Rate limit hit for {}, retry {} of {} after {:?}",
            operation,
            attempt,
            attempts - 1,
            delay
        );
        tokio::time::sleep(delay).await;
    }
}

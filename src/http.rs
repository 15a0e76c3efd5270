//! Shared HTTP plumbing for remote embedding and generation providers.
//!
//! Every provider call goes through [`post_json`], which applies the retry
//! strategy and bounds the whole exchange (all attempts and backoff sleeps
//! included) by the configured timeout.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use docmind_core::CapabilityError;
use reqwest::StatusCode;
use serde_json::Value;

/// Retry and deadline settings for one provider.
#[derive(Debug, Clone, Copy)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl CallPolicy {
    pub fn new(timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
        }
    }
}

/// What to do with a non-success HTTP status.
#[derive(Debug, PartialEq, Eq)]
enum StatusAction {
    Retry,
    Fail,
}

fn classify(status: StatusCode) -> StatusAction {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusAction::Retry
    } else {
        StatusAction::Fail
    }
}

/// Delay before retry `attempt` (1-based).
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt.saturating_sub(1)).min(5))
}

/// Build the HTTP client shared by a provider's calls.
pub fn client() -> Result<reqwest::Client, CapabilityError> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| CapabilityError::Provider(format!("failed to build HTTP client: {}", e)))
}

/// POST a JSON body and return the parsed JSON response.
///
/// `provider` labels error messages (e.g. `"OpenAI"`).
pub async fn post_json(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    headers: &[(&str, String)],
    body: &Value,
    policy: CallPolicy,
) -> Result<Value, CapabilityError> {
    let exchange = send_with_retry(client, provider, url, headers, body, policy.max_retries);
    match tokio::time::timeout(policy.timeout, exchange).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(provider, timeout = ?policy.timeout, "provider call timed out");
            Err(CapabilityError::Timeout(policy.timeout))
        }
    }
}

async fn send_with_retry(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    headers: &[(&str, String)],
    body: &Value,
    max_retries: u32,
) -> Result<Value, CapabilityError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            tracing::debug!(provider, attempt, ?delay, "retrying provider call");
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response.json::<Value>().await.map_err(|e| {
                        CapabilityError::InvalidResponse(format!(
                            "{} returned non-JSON body: {}",
                            provider, e
                        ))
                    });
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = CapabilityError::Provider(format!(
                    "{} API error {}: {}",
                    provider, status, body_text
                ));
                match classify(status) {
                    StatusAction::Retry => {
                        tracing::warn!(provider, %status, attempt, "transient provider error");
                        last_err = Some(err);
                    }
                    StatusAction::Fail => return Err(err),
                }
            }
            Err(e) => {
                tracing::warn!(provider, attempt, error = %e, "provider request failed");
                last_err = Some(CapabilityError::Provider(format!(
                    "{} request failed: {}",
                    provider, e
                )));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        CapabilityError::Provider(format!("{} call failed after retries", provider))
    }))
}

/// Read a string at a JSON pointer, reporting a malformed response otherwise.
pub fn string_at<'a>(json: &'a Value, pointer: &str, provider: &str) -> Result<&'a str, CapabilityError> {
    json.pointer(pointer).and_then(|v| v.as_str()).ok_or_else(|| {
        CapabilityError::InvalidResponse(format!("{} response missing {}", provider, pointer))
    })
}

/// Convert a JSON array of numbers to an `f32` vector.
pub fn float_array(value: Option<&Value>, provider: &str) -> Result<Vec<f32>, CapabilityError> {
    let items = value.and_then(|v| v.as_array()).ok_or_else(|| {
        CapabilityError::InvalidResponse(format!("{} response missing embedding array", provider))
    })?;
    items
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                CapabilityError::InvalidResponse(format!(
                    "{} embedding contains a non-numeric value",
                    provider
                ))
            })
        })
        .collect()
}

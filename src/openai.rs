//! Shared OpenAI API plumbing.
//!
//! Both endpoints this tool calls (`/v1/embeddings` and
//! `/v1/chat/completions`) go through one [`ApiClient`]: bearer credential
//! from the `OPENAI_API_KEY` environment variable, a bounded per-request
//! timeout, and the same retry policy.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network/timeout errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//! - Attempts: `1 + max_retries`, then the last error is reported

use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::config::OpenAiConfig;

const API_BASE: &str = "https://api.openai.com/v1";

/// Error bodies are truncated to this many characters in error messages.
const ERROR_BODY_LIMIT: usize = 400;

/// HTTP client for the OpenAI API with credential, timeout, and retry baked
/// in.
pub struct ApiClient {
    client: reqwest::Client,
    api_key: String,
    max_retries: u32,
}

impl ApiClient {
    /// Build a client from the `[openai]` config section. Fails if
    /// `OPENAI_API_KEY` is not set in the environment.
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            anyhow::anyhow!(
                "OPENAI_API_KEY environment variable not set (required to call the OpenAI API)"
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            max_retries: config.max_retries,
        })
    }

    /// POST a JSON body to an endpoint under the API base (e.g.
    /// `"embeddings"`) and return the decoded JSON response, retrying
    /// transient failures with exponential backoff.
    pub async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let url = format!("{}/{}", API_BASE, endpoint);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }

            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json()
                            .await
                            .context("Failed to decode API response body");
                    }

                    // Rate limited or server error, worth retrying
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            excerpt(&body_text)
                        ));
                        continue;
                    }

                    // Other client errors are not retryable
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, excerpt(&body_text));
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        let err = last_err.unwrap_or_else(|| anyhow::anyhow!("OpenAI request failed"));
        Err(err.context(format!(
            "Giving up after {} attempts",
            self.max_retries + 1
        )))
    }
}

/// Exponential backoff: 1s, 2s, 4s, 8s, 16s, then capped at 32s.
/// Only called with `attempt >= 1`.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt - 1).min(5))
}

/// First `ERROR_BODY_LIMIT` characters of an error body, marked when cut.
fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_LIMIT {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(ERROR_BODY_LIMIT).collect();
        format!("{}...", cut)
    }
}

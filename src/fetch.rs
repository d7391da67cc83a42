//! HTTP fetch with bounded, linearly backed-off retries
//!
//! 5xx answers and connection problems are retried, every other non-2xx
//! status gives up immediately.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error, warn};

use crate::config::FetchSettings;
use crate::error::FetchError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Sleep before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl From<&FetchSettings> for RetryPolicy {
    fn from(settings: &FetchSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            backoff: Duration::from_secs(settings.backoff_secs),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retry,
    Fatal,
}

pub fn classify(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        500..=599 => StatusClass::Retry,
        _ => StatusClass::Fatal,
    }
}

#[derive(Clone, Debug)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, RetryPolicy::from(settings)))
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// GET `url`, retrying transient failures according to the policy.
    pub async fn fetch(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<FetchResponse, FetchError> {
        let mut last = String::from("no attempt made");

        for attempt in 0..self.policy.attempts() {
            if attempt > 0 {
                let delay = self.policy.delay(attempt);
                warn!("🔁 Retry {} for {} in {:?} ({})", attempt, url, delay, last);
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match classify(status) {
                        StatusClass::Success => {
                            let body = response.text().await?;
                            debug!("Fetched {} ({} bytes)", url, body.len());
                            return Ok(FetchResponse { status, body });
                        }
                        StatusClass::Retry => {
                            error!("Got HTTP {} from {} on try {}", status, url, attempt + 1);
                            last = format!("HTTP {}", status);
                        }
                        StatusClass::Fatal => {
                            error!("Unexpected HTTP {} from {}, not retrying", status, url);
                            return Err(FetchError::Http {
                                url: url.to_string(),
                                status,
                            });
                        }
                    }
                }
                Err(e) if e.is_builder() => return Err(FetchError::Network(e)),
                Err(e) => {
                    warn!("Request to {} failed on try {}: {}", url, attempt + 1, e);
                    last = e.to_string();
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts: self.policy.attempts(),
            last,
        })
    }
}

/// Append query parameters to a base URL.
pub fn with_query(base: &str, params: &[(&str, &str)]) -> Result<String, FetchError> {
    url::Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|e| FetchError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })
}

//! OpenAI HTTP client with rate limiting

use super::config::OpenAiConfig;
use super::types::ApiError;
use drilldown_core::{truncate_chars, ConfigError, UpstreamError};
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Maximum characters of a provider error message carried upstream.
const ERROR_MESSAGE_CHARS: usize = 300;

/// Sentinel for "no request sent yet".
const NEVER: u64 = u64::MAX;

/// OpenAI API client with rate limiting.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: Arc<Semaphore>,
    last_request: Arc<AtomicU64>,
    min_request_interval_ms: u64,
    start_time: Instant,
}

impl OpenAiClient {
    /// Create a client from config. Fails only if the HTTP client cannot be
    /// built or no API key is configured.
    pub fn new(config: &OpenAiConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "OPENAI_API_KEY".to_string(),
            })?;

        let rpm = config.requests_per_minute.max(1);
        let min_interval_ms = (60_000 / rpm as u64).max(10);

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http_client".to_string(),
                value: format!("{:?}", config.request_timeout),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(Semaphore::new(rpm as usize)),
            last_request: Arc::new(AtomicU64::new(NEVER)),
            min_request_interval_ms: min_interval_ms,
            start_time: Instant::now(),
        })
    }

    /// POST `body` to `endpoint` and return the raw success body.
    pub async fn post_text<Req: Serialize>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> Result<String, UpstreamError> {
        // Rate limiting: acquire permit
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| UpstreamError::transport(format!("rate limiter closed: {}", e)))?;

        // Enforce minimum interval between requests
        let now_ms = self.start_time.elapsed().as_millis() as u64;
        let last_ms = self.last_request.swap(now_ms, Ordering::Relaxed);
        if last_ms != NEVER {
            let elapsed = now_ms.saturating_sub(last_ms);
            if elapsed < self.min_request_interval_ms {
                let wait_ms = self.min_request_interval_ms - elapsed;
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            }
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::transport(format!("failed to read body: {}", e)))?;

        if status.is_success() {
            return Ok(text);
        }

        let message = match serde_json::from_str::<ApiError>(&text) {
            Ok(api_error) => api_error.error.message,
            Err(_) => text,
        };
        Err(UpstreamError::http(
            status.as_u16(),
            truncate_chars(&message, ERROR_MESSAGE_CHARS),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let err = OpenAiClient::new(&OpenAiConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }

    #[test]
    fn test_debug_redacts_key_and_trims_base_url() {
        let config = OpenAiConfig::default()
            .with_api_key("sk-very-secret")
            .with_base_url("http://localhost:9999/v1/");
        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9999/v1");
        let debug = format!("{:?}", client);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}

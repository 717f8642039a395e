//! Outbound delivery through an HTTP chat gateway.
//!
//! Each message is a `POST {gateway_url}` with `{"to": "...", "text": "..."}`.
//! Transient failures (connection errors, 5xx, 429) are retried with linear
//! backoff; other 4xx answers are final.

use std::time::Duration;

use funnelbot_core::port::ChatTransport;
use funnelbot_types::config::TransportConfig;
use funnelbot_types::error::TransportError;
use serde::Serialize;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct OutboundPayload<'a> {
    to: &'a str,
    text: &'a str,
}

#[derive(Debug)]
pub struct HttpGatewayTransport {
    client: reqwest::Client,
    url: String,
    max_retries: u32,
    backoff: Duration,
}

impl HttpGatewayTransport {
    pub fn new(url: impl Into<String>, config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(Self::with_http_client(url, config, client))
    }

    pub fn with_http_client(url: impl Into<String>, config: &TransportConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            url: url.into(),
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    async fn attempt(&self, payload: &OutboundPayload<'_>) -> Result<(), Attempt> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| Attempt::Retry(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = format!("{status}: {}", response.text().await.unwrap_or_default());
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(Attempt::Retry(detail))
        } else {
            Err(Attempt::Fatal(detail))
        }
    }
}

enum Attempt {
    Retry(String),
    Fatal(String),
}

impl ChatTransport for HttpGatewayTransport {
    async fn send(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        let payload = OutboundPayload { to: user_id, text };
        let attempts = self.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(&payload).await {
                Ok(()) => {
                    tracing::debug!(user_id, attempt, "message delivered");
                    return Ok(());
                }
                Err(Attempt::Fatal(detail)) => {
                    tracing::warn!(user_id, error = %detail, "gateway rejected message");
                    return Err(TransportError::Rejected(detail));
                }
                Err(Attempt::Retry(detail)) => {
                    tracing::warn!(user_id, attempt, error = %detail, "send attempt failed");
                    last_error = detail;
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        Err(TransportError::RetriesExhausted { attempts, last_error })
    }
}

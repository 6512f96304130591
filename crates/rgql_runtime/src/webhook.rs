//! Webhook delivery.

use crate::error::{ErrorCode, RgqlResult, ResultExt};
use crate::execution::ExecutionResult;
use async_trait::async_trait;
use std::time::Duration;

/// Pushes subscription results to a subscriber's URL.
#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn send(&self, url: &str, payload: &ExecutionResult) -> RgqlResult<()>;
}

/// Request timeout of [`HttpWebhookSender::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers results as JSON `POST` requests.
///
/// Any transport failure, timeout or non-success status is reported as a
/// `PUSH_ERROR`.
#[derive(Debug, Clone)]
pub struct HttpWebhookSender {
    client: reqwest::Client,
}

impl HttpWebhookSender {
    /// A sender with [`DEFAULT_TIMEOUT`].
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Uses a preconfigured client (proxies, TLS roots, default headers).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds a sender whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> RgqlResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_rgql_err(ErrorCode::ConfigError)?;
        Ok(Self { client })
    }
}

impl Default for HttpWebhookSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookSender for HttpWebhookSender {
    async fn send(&self, url: &str, payload: &ExecutionResult) -> RgqlResult<()> {
        self.client
            .post(url)
            .json(payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_rgql_err(ErrorCode::PushError)?;
        Ok(())
    }
}

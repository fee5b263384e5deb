//! Webhook notifier
//!
//! Sends confirmations as JSON via HTTP POST to a relay that forwards them
//! as SMS.
//!
//! # Payload Format
//!
//! ```json
//! {
//!   "phone": "13800000000",
//!   "template_params": { "name": "Alice", "date": "2024-09-17", "time": "20:00" }
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{BookingNotice, Notifier, NotifyError, NotifyResult};
use crate::config::NotifyConfig;

/// Webhook notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// Optional bearer token
    pub auth_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }

    /// Webhook settings from the `[notify]` section, if a URL is configured
    pub fn from_notify_config(config: &NotifyConfig) -> Option<Self> {
        config.webhook_url.as_ref().map(|url| Self {
            url: url.clone(),
            auth_token: None,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err("Webhook URL must start with http:// or https://".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Notifier posting to an SMS relay webhook
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> NotifyResult<Self> {
        config.validate().map_err(NotifyError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn build_payload(notice: &BookingNotice) -> serde_json::Value {
        serde_json::json!({
            "phone": notice.phone,
            "template_params": notice.template_params(),
        })
    }

    async fn send_with_retry(&self, payload: &serde_json::Value) -> NotifyResult<()> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * 2_u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
                tracing::debug!(attempt, "Retrying webhook delivery");
            }

            let mut request = self.client.post(&self.config.url);
            if let Some(token) = &self.config.auth_token {
                request = request.bearer_auth(token);
            }

            match request.json(payload).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url = %self.config.url, "Webhook delivered");
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    last_error = Some(NotifyError::Delivery(format!("HTTP {status}: {body}")));

                    // Don't retry on client errors (4xx)
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => last_error = Some(NotifyError::Http(e)),
            }
        }

        Err(last_error.unwrap_or_else(|| NotifyError::Delivery("no attempt made".to_string())))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, notice: &BookingNotice) -> NotifyResult<()> {
        notice.require_phone()?;
        self.send_with_retry(&Self::build_payload(notice)).await
    }
}

//! Webhook delivery for alert notifications.
//!
//! Notifications are POSTed as JSON. When a secret is configured the body is
//! signed with HMAC-SHA256 and the hex digest is sent in the
//! `X-Signature-256` header as `sha256=<digest>`.

use super::alert::{AlertNotification, AlertSink};
use super::error::{SinkError, SinkResult};
use crate::security::SecureString;
use async_trait::async_trait;
use ring::hmac;
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for a webhook destination.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    url: String,
    headers: HashMap<String, String>,
    secret: Option<SecureString>,
    timeout: Duration,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            secret: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_secret(mut self, secret: impl Into<SecureString>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> SinkResult<()> {
        let url_lower = self.url.to_lowercase();
        if !url_lower.starts_with("http://") && !url_lower.starts_with("https://") {
            return Err(SinkError::Configuration {
                message: "Webhook URL must start with http:// or https://".to_string(),
            });
        }

        if reqwest::Url::parse(&self.url).is_err() {
            return Err(SinkError::Configuration {
                message: format!("Invalid webhook URL: {}", self.url),
            });
        }

        Ok(())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Posts notifications to an HTTP endpoint.
pub struct WebhookAlertSink {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookAlertSink {
    pub fn new(config: WebhookConfig) -> SinkResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SinkError::Configuration {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    /// Hex-encoded HMAC-SHA256 of `body` under `secret`.
    pub fn sign_payload(body: &str, secret: &str) -> String {
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
        let signature = hmac::sign(&key, body.as_bytes());
        hex::encode(signature.as_ref())
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn publish(&self, notification: &AlertNotification) -> SinkResult<()> {
        let body = serde_json::to_string(notification)?;

        let mut request = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json");

        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }

        if let Some(secret) = &self.config.secret {
            let signature = Self::sign_payload(&body, secret.expose());
            request = request.header("X-Signature-256", format!("sha256={signature}"));
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::Network {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SinkError::Server { status, message });
        }

        tracing::debug!(url = %self.config.url, subject = %notification.subject, "Webhook delivered");
        Ok(())
    }
}

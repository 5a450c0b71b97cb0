//! Mail relay client.
//!
//! Posts each message as JSON `{from, to, subject, html}` to an HTTP mail
//! relay, authenticated with a bearer API key.
//!
//! ## Security
//!
//! - The API key is NEVER logged (redacted in `Debug`)
//! - Message bodies are never logged

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{EmailMessage, MailError, Mailer};
use crate::forwarder::truncate_body;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the mail relay client.
#[derive(Clone)]
pub struct HttpMailerConfig {
    /// Relay endpoint receiving the JSON message
    pub endpoint: String,
    /// Bearer key for the relay (NEVER log this value)
    api_key: String,
    /// Sender address
    pub from: String,
    /// Request timeout
    pub timeout: Duration,
}

impl HttpMailerConfig {
    /// Creates a relay configuration with a 10 second timeout.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            from: from.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for HttpMailerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMailerConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("from", &self.from)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// HTTP Mailer
// ============================================================================

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Mailer backed by an HTTP mail relay.
#[derive(Debug)]
pub struct HttpMailer {
    client: Client,
    config: HttpMailerConfig,
}

impl HttpMailer {
    /// Create a new relay client.
    ///
    /// # Errors
    ///
    /// - `MailError::NotConfigured` if the endpoint or sender is empty
    /// - `MailError::Transport` if the HTTP client cannot be built
    pub fn new(config: HttpMailerConfig) -> Result<Self, MailError> {
        if config.endpoint.trim().is_empty() {
            return Err(MailError::NotConfigured {
                details: "mail.endpoint is empty".to_string(),
            });
        }
        if config.from.trim().is_empty() {
            return Err(MailError::NotConfigured {
                details: "mail.from is empty".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MailError::Transport {
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let body = RelayMessage {
            from: &self.config.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("timed out after {}s", self.config.timeout.as_secs())
                } else {
                    e.to_string()
                };
                warn!(to = %message.to, reason = %reason, "Mail relay unreachable");
                MailError::Transport { reason }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(to = %message.to, status = status.as_u16(), "Mail relay rejected message");
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        debug!(to = %message.to, subject = %message.subject, "Email handed to relay");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

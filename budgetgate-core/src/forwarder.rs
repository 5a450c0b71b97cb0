//! Downstream forwarding of approved requests.
//!
//! An approved request is POSTed as JSON `{email, budget, module}` to the
//! processing endpoint. Only HTTP 200 counts as success.
//!
//! # Error Classification
//!
//! - Endpoint not configured → `ForwardError::NotConfigured`
//! - Timeout → `ForwardError::Timeout`
//! - Connection and other transport errors → `ForwardError::Transport`
//! - Non-200 status → `Ok(ForwardResponse)` with `is_success() == false`;
//!   the caller decides how to report it
//!
//! No automatic retry: the downstream action is not known to be idempotent.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::request::ApprovalRequest;

/// Response bodies kept in errors and operator reports are cut to this many
/// characters.
const MAX_REPORTED_BODY_CHARS: usize = 2048;

/// Truncates a response body for inclusion in errors and reports.
pub(crate) fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_REPORTED_BODY_CHARS {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(MAX_REPORTED_BODY_CHARS).collect();
    truncated.push_str("...[truncated]");
    truncated
}

// ============================================================================
// Errors and Responses
// ============================================================================

/// Errors that prevent a downstream call from completing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForwardError {
    /// No downstream URL is configured.
    #[error("downstream endpoint is not configured")]
    NotConfigured,

    /// The call did not finish within the configured timeout.
    #[error("downstream call to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Endpoint URL
        url: String,
        /// Configured timeout in seconds
        timeout_secs: u64,
    },

    /// The endpoint could not be reached.
    #[error("downstream call to {url} failed: {reason}")]
    Transport {
        /// Endpoint URL
        url: String,
        /// Reason for failure
        reason: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to build downstream client: {details}")]
    Client {
        /// Builder error message
        details: String,
    },
}

/// Status and body returned by the downstream endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body (truncated)
    pub body: String,
}

impl ForwardResponse {
    /// True only for HTTP 200.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

// ============================================================================
// Forwarder Trait
// ============================================================================

/// Sends approved requests downstream.
///
/// Abstracted so the flow can be tested without a live endpoint.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Forwards one approved request.
    ///
    /// # Errors
    ///
    /// Returns `ForwardError` if the call could not be completed. A completed
    /// call with a non-200 status is `Ok`.
    async fn forward(&self, request: &ApprovalRequest) -> Result<ForwardResponse, ForwardError>;
}

// ============================================================================
// HTTP Forwarder
// ============================================================================

/// Wire body for the downstream endpoint.
#[derive(Debug, Serialize)]
struct DownstreamPayload<'a> {
    email: &'a str,
    budget: String,
    module: &'a str,
}

impl<'a> From<&'a ApprovalRequest> for DownstreamPayload<'a> {
    fn from(request: &'a ApprovalRequest) -> Self {
        Self {
            email: request.submitter_email(),
            budget: request.wire_budget(),
            module: request.module(),
        }
    }
}

/// Forwarder that POSTs JSON to a configured URL.
#[derive(Debug)]
pub struct HttpForwarder {
    client: Client,
    url: Option<String>,
    timeout: Duration,
}

impl HttpForwarder {
    /// Creates a forwarder.
    ///
    /// `url` may be `None`: every call then fails with
    /// `ForwardError::NotConfigured` instead of failing at startup.
    ///
    /// # Errors
    ///
    /// Returns `ForwardError::Client` if the HTTP client cannot be built.
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self, ForwardError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForwardError::Client {
                details: e.to_string(),
            })?;

        let url = url.filter(|u| !u.trim().is_empty());
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    fn classify_error(&self, url: &str, error: reqwest::Error) -> ForwardError {
        if error.is_timeout() {
            warn!(
                url = %url,
                timeout_secs = self.timeout.as_secs(),
                "Downstream request timed out"
            );
            ForwardError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            warn!(url = %url, error = %error, "Downstream request failed");
            ForwardError::Transport {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    #[tracing::instrument(skip_all, fields(module = %request.module(), budget = %request.wire_budget()))]
    async fn forward(&self, request: &ApprovalRequest) -> Result<ForwardResponse, ForwardError> {
        let url = self.url.as_deref().ok_or(ForwardError::NotConfigured)?;

        debug!(url = %url, "Forwarding approved request downstream");

        let response = self
            .client
            .post(url)
            .json(&DownstreamPayload::from(request))
            .send()
            .await
            .map_err(|e| self.classify_error(url, e))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let response = ForwardResponse {
            status,
            body: truncate_body(&body),
        };

        if response.is_success() {
            debug!(status = status, "Downstream accepted request");
        } else {
            warn!(status = status, "Downstream returned non-success status");
        }
        Ok(response)
    }
}

//! Outbound notifications: submitter and manager emails, operator alerts.
//!
//! ## Module Organization
//!
//! - `mod.rs` - Trait definitions, messages and errors
//! - `http_mailer.rs` - Mail relay client (JSON over HTTPS, bearer key)
//! - `log_mailer.rs` - Log-only mailer for development and tests
//! - `templates.rs` - Subject and HTML body composition
//! - `notifier.rs` - Outcome notifications built on a [`Mailer`]
//! - `operator.rs` - [`CriticalSink`] that logs and emails the operator

pub mod http_mailer;
pub mod log_mailer;
pub mod notifier;
pub mod operator;
pub mod templates;

pub use http_mailer::{HttpMailer, HttpMailerConfig};
pub use log_mailer::LogMailer;
pub use notifier::Notifier;
pub use operator::MailCriticalSink;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::request::ApprovalRequest;

// ============================================================================
// Email Message
// ============================================================================

/// A composed email, ready to hand to a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,
    /// Plain-text subject line
    pub subject: String,
    /// HTML body; interpolated values are already escaped
    pub html: String,
}

// ============================================================================
// Mail Errors
// ============================================================================

/// Errors from mail delivery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    /// The mailer is missing a required setting.
    #[error("mailer is not configured: {details}")]
    NotConfigured {
        /// Which setting is missing
        details: String,
    },

    /// The relay could not be reached or did not answer in time.
    #[error("mail transport failed: {reason}")]
    Transport {
        /// Reason for failure
        reason: String,
    },

    /// The relay answered with a non-success status.
    #[error("mail relay rejected message with HTTP {status}")]
    Rejected {
        /// HTTP status code returned
        status: u16,
        /// Response body (truncated)
        body: String,
    },
}

// ============================================================================
// Mailer Trait
// ============================================================================

/// Delivers composed emails.
///
/// Implementations must not log message bodies or credentials.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the message could not be handed off.
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;

    /// Returns the mailer name for logging.
    fn name(&self) -> &'static str;
}

// ============================================================================
// Critical Reports
// ============================================================================

/// Where in the workflow a critical failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Submission validation
    Submission,
    /// Issuing tokens and emailing the manager
    Initiation,
    /// Retrieving a token on link visit
    Resolution,
    /// Calling the downstream endpoint
    Forwarding,
    /// Emailing a decision to the submitter
    Notification,
    /// A panic caught at an entry point
    Panic,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Submission => "submission",
            Self::Initiation => "initiation",
            Self::Resolution => "resolution",
            Self::Forwarding => "forwarding",
            Self::Notification => "notification",
            Self::Panic => "panic",
        };
        f.write_str(name)
    }
}

/// Diagnostic context handed to the operator channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalReport {
    /// Workflow stage that failed
    pub stage: FailureStage,
    /// Human-readable description, including status and body where relevant
    pub message: String,
    /// The request being processed, when one was available
    pub request: Option<ApprovalRequest>,
    /// When the failure was observed
    pub occurred_at: DateTime<Utc>,
}

impl CriticalReport {
    /// Creates a report without request context.
    #[must_use]
    pub fn new(stage: FailureStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            request: None,
            occurred_at: Utc::now(),
        }
    }

    /// Attaches the request so the operator can remediate manually.
    #[must_use]
    pub fn with_request(mut self, request: &ApprovalRequest) -> Self {
        self.request = Some(request.clone());
        self
    }
}

/// Operator alert channel.
///
/// Reporting never fails from the caller's point of view: a sink that
/// cannot deliver logs the problem and returns.
#[async_trait]
pub trait CriticalSink: Send + Sync {
    /// Reports a condition that needs human attention.
    async fn report_critical(&self, report: CriticalReport);
}

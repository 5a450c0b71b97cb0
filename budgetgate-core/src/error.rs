//! Error types for the approval flow.
//!
//! Errors never reach an end user verbatim. Entry points in
//! [`crate::flow`] convert them into fixed outcomes and hand the details to
//! the operator channel.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::forwarder::ForwardError;
use crate::notify::MailError;
use crate::token::TokenStoreError;

// ============================================================================
// Validation Errors
// ============================================================================

/// Reasons a submission is refused before any processing happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No submitter email in the form.
    #[error("submitter email is missing")]
    MissingSubmitterEmail,

    /// No manager email in the form.
    #[error("manager email is missing")]
    MissingManagerEmail,

    /// A field that must hold an email address does not look like one.
    #[error("{field} is not a valid email address: '{value}'")]
    InvalidEmail {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: String,
    },

    /// No budget amount in the form.
    #[error("budget is missing")]
    MissingBudget,

    /// Budget text could not be parsed as an amount.
    #[error("budget '{raw}' is not a number")]
    MalformedBudget {
        /// The raw text as submitted
        raw: String,
    },

    /// The form body could not be decoded at all.
    #[error("submission body is unreadable: {reason}")]
    UnreadableForm {
        /// Decoder message
        reason: String,
    },

    /// Budget is below zero.
    #[error("budget {budget} is negative")]
    NegativeBudget {
        /// The parsed amount
        budget: Decimal,
    },
}

// ============================================================================
// Flow Errors
// ============================================================================

/// Errors raised while initiating or resolving an approval.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A configuration value required for this operation is absent.
    #[error("configuration value '{key}' is not set")]
    ConfigurationMissing {
        /// Dotted configuration key (e.g. `links.base_url`)
        key: &'static str,
    },

    /// The submission failed validation.
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    /// The token store refused a write or held an unreadable payload.
    #[error("token store error: {0}")]
    Store(#[from] TokenStoreError),

    /// The downstream endpoint answered with a non-success status.
    #[error("downstream endpoint returned HTTP {status}")]
    Downstream {
        /// HTTP status code returned
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// The downstream call could not be completed.
    #[error("downstream call failed: {0}")]
    Forward(#[source] ForwardError),

    /// An email could not be delivered.
    #[error("notification failed: {0}")]
    Notification(#[from] MailError),

    /// A link could not be built from the configured base URL.
    #[error("cannot build approval link: {details}")]
    InvalidLink {
        /// Why link construction failed
        details: String,
    },
}

impl From<ForwardError> for FlowError {
    fn from(err: ForwardError) -> Self {
        match err {
            ForwardError::NotConfigured => FlowError::ConfigurationMissing {
                key: "downstream.url",
            },
            other => FlowError::Forward(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_not_configured_maps_to_configuration_missing() {
        let err: FlowError = ForwardError::NotConfigured.into();
        assert!(matches!(
            err,
            FlowError::ConfigurationMissing {
                key: "downstream.url"
            }
        ));
    }

    #[test]
    fn test_forward_timeout_stays_forward_error() {
        let err: FlowError = ForwardError::Timeout {
            url: "http://x".to_string(),
            timeout_secs: 30,
        }
        .into();
        assert!(matches!(err, FlowError::Forward(ForwardError::Timeout { .. })));
    }

    #[test]
    fn test_validation_error_converts() {
        let err: FlowError = ValidationError::MissingBudget.into();
        assert_eq!(err.to_string(), "invalid submission: budget is missing");
    }

    #[test]
    fn test_display_messages() {
        let err = FlowError::ConfigurationMissing {
            key: "links.base_url",
        };
        assert_eq!(err.to_string(), "configuration value 'links.base_url' is not set");

        let err = FlowError::Downstream {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "downstream endpoint returned HTTP 500");
    }
}

//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    // ─────────────────────────────────────────────────────────────────────────
    // Value validation errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Schema version not supported.
    #[error("unsupported schema version {version}, expected 1")]
    UnsupportedSchemaVersion { version: u32 },

    /// A URL setting is not an absolute http(s) URL.
    #[error("invalid URL '{url}' for {field}: {message}")]
    InvalidUrl {
        field: &'static str,
        url: String,
        message: String,
    },

    /// An email setting does not look like an address.
    #[error("invalid email '{value}' for {field}")]
    InvalidEmail { field: &'static str, value: String },

    /// A setting required by another setting is absent.
    #[error("{field} is required when {because}")]
    MissingSetting {
        field: &'static str,
        because: &'static str,
    },

    /// Auto-approval threshold below zero.
    #[error("invalid routing.threshold {threshold}: must not be negative")]
    InvalidThreshold { threshold: String },

    /// Token TTL outside the accepted range.
    #[error("invalid links.ttl {ttl}: must be between {min} and {max}")]
    InvalidTtl {
        ttl: String,
        min: String,
        max: String,
    },

    /// A duration or count that must be positive is zero.
    #[error("invalid {field}: must be greater than zero")]
    MustBePositive { field: &'static str },

    /// Required environment variable not set.
    #[error("environment variable '{var}' not set (required for field '{field}')")]
    MissingEnvVar { var: String, field: String },

    // ─────────────────────────────────────────────────────────────────────────
    // I/O and parsing errors
    // ─────────────────────────────────────────────────────────────────────────
    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    ParseError(#[from] serde_saphyr::Error),

    /// I/O error reading config file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Config file not found at any search location.
    #[error("configuration file not found (searched: {searched:?})")]
    ConfigFileNotFound { searched: Vec<PathBuf> },

    /// Empty configuration file.
    #[error("configuration file is empty")]
    EmptyConfigFile,
}

/// Validation warnings (non-fatal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// Without a base URL, over-threshold requests cannot be initiated.
    MissingBaseUrl,

    /// Without a downstream URL, nothing can be forwarded.
    MissingDownstreamUrl,

    /// Emails are logged, not delivered.
    LogMailTransport,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBaseUrl => write!(
                f,
                "links.base_url is not set; requests above the threshold will fail"
            ),
            Self::MissingDownstreamUrl => write!(
                f,
                "downstream.url is not set; approved requests cannot be forwarded"
            ),
            Self::LogMailTransport => write!(
                f,
                "mail.transport is 'log'; no email will actually be delivered"
            ),
        }
    }
}

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings encountered during validation.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Check if validation passed with no warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

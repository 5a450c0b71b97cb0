//! Configuration schema.
//!
//! # Example
//!
//! ```yaml
//! schema: 1
//! links:
//!   base_url: https://approvals.example.com/approval
//!   ttl: 6h
//! routing:
//!   threshold: 20
//! downstream:
//!   url: https://processing.example.com/requests
//!   timeout: 30s
//! mail:
//!   transport: http
//!   endpoint: https://mail-relay.example.com/send
//!   api_key: ${MAIL_API_KEY}
//!   from: budget-approvals@example.com
//! operator:
//!   email: ops@example.com
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::duration_format;
use crate::flow::FlowSettings;
use crate::token::TokenStoreConfig;

/// Root configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Schema version (must be 1).
    pub schema: u32,

    /// Approval link construction.
    #[serde(default)]
    pub links: LinksConfig,

    /// Auto-approval routing.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Downstream processing endpoint.
    #[serde(default)]
    pub downstream: DownstreamConfig,

    /// Outbound email.
    #[serde(default)]
    pub mail: MailConfig,

    /// Operator alert destination.
    pub operator: OperatorConfig,

    /// Token store sizing.
    #[serde(default)]
    pub store: StoreConfig,
}

impl AppConfig {
    /// Settings handed to the approval flow.
    #[must_use]
    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            base_url: self.links.base_url.clone(),
            token_ttl: self.links.ttl,
            threshold: self.routing.threshold,
        }
    }

    /// Settings handed to the token store.
    #[must_use]
    pub fn store_config(&self) -> TokenStoreConfig {
        TokenStoreConfig {
            default_ttl: self.links.ttl,
            max_entries: self.store.max_entries,
        }
    }
}

/// `links` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinksConfig {
    /// Page receiving `?token=` visits. Optional at load time; initiating an
    /// approval without it is an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Lifetime of an approve/deny pair.
    #[serde(default = "default_ttl", with = "duration_format")]
    pub ttl: Duration,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            ttl: default_ttl(),
        }
    }
}

fn default_ttl() -> Duration {
    Duration::from_secs(6 * 3600)
}

/// `routing` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// Largest amount approved without a manager (inclusive).
    #[serde(default = "default_threshold")]
    pub threshold: Decimal,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> Decimal {
    Decimal::from(20)
}

/// `downstream` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownstreamConfig {
    /// Endpoint receiving approved requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Timeout for one downstream call.
    #[serde(default = "default_downstream_timeout", with = "duration_format")]
    pub timeout: Duration,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: default_downstream_timeout(),
        }
    }
}

fn default_downstream_timeout() -> Duration {
    Duration::from_secs(30)
}

/// How outbound email leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTransport {
    /// POST to an HTTP mail relay
    Http,
    /// Log metadata only
    #[default]
    Log,
}

/// `mail` section.
#[derive(Clone, Deserialize, Serialize)]
pub struct MailConfig {
    /// Delivery mechanism.
    #[serde(default)]
    pub transport: MailTransport,

    /// Relay endpoint (required for `http`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Relay bearer key (NEVER log this value).
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Sender address (required for `http`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Timeout for one relay call.
    #[serde(default = "default_mail_timeout", with = "duration_format")]
    pub timeout: Duration,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransport::default(),
            endpoint: None,
            api_key: None,
            from: None,
            timeout: default_mail_timeout(),
        }
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("transport", &self.transport)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("from", &self.from)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn default_mail_timeout() -> Duration {
    Duration::from_secs(10)
}

/// `operator` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OperatorConfig {
    /// Address receiving critical failure reports.
    pub email: String,
}

/// `store` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Live entries allowed before writes are refused.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// How often expired entries are reclaimed.
    #[serde(default = "default_sweep_interval", with = "duration_format")]
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

fn default_max_entries() -> usize {
    10_000
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

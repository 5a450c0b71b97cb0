//! BudgetGate Core: transport-agnostic budget approval library.
//!
//! This library provides the approval-token state machine used by the HTTP
//! service (`budgetgate-server`):
//!
//! - Submission validation and the immutable [`ApprovalRequest`] entity
//! - Threshold routing between auto-approval and manager approval
//! - An in-memory single-use token store with per-entry TTL
//! - The approval flow that issues links and resolves them exactly once
//! - Downstream forwarding, email notifications, and operator alerts
//! - YAML configuration loading and validation
//!
//! # Flow
//!
//! ```text
//! submission ──▶ route(budget, threshold)
//!                  ├─ AutoApprove ──────▶ forward ──▶ notify submitter
//!                  └─ RequiresApproval ─▶ put_pair(approve, deny) ──▶ email manager
//!
//! GET ?token=… ──▶ get_and_invalidate ──▶ Approve ─▶ forward ─▶ notify submitter
//!                                     └─▶ Deny ────▶ notify submitter
//! ```

pub mod config;
pub mod error;
pub mod flow;
pub mod forwarder;
pub mod notify;
pub mod request;
pub mod router;
pub mod token;

pub use error::{FlowError, ValidationError};
pub use flow::{ApprovalFlow, FlowSettings, Resolution, SubmissionOutcome};
pub use forwarder::{ForwardError, ForwardResponse, Forwarder, HttpForwarder};
pub use notify::{CriticalReport, CriticalSink, FailureStage, Mailer, Notifier};
pub use request::{ApprovalRequest, Submission};
pub use router::{Decision, route};
pub use token::{ApprovalLinks, TokenIntent, TokenStore, TokenStoreConfig, TokenValue};

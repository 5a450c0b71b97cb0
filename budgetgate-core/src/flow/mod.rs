//! Approval flow: issues single-use links and resolves them exactly once.
//!
//! ## State Machine
//!
//! ```text
//! Pending ──approve link──▶ Approved   (forwarded, submitter notified)
//!    │    ──deny link─────▶ Denied     (submitter notified)
//!    │    ──TTL elapses───▶ Expired
//!    └─── sibling used ───▶ Expired
//! (no token / not a token)▶ Invalid
//! ```
//!
//! `Error` is not a request state. It is what the visitor sees when the
//! decision was taken but processing it failed.
//!
//! ## Failure Containment
//!
//! [`ApprovalFlow::handle_submission`] and [`ApprovalFlow::handle_link`] are
//! the only entry points. Every failure below them, panics included, ends in
//! a fixed outcome for the caller and a [`CriticalReport`] for the operator.

mod outcome;

pub use outcome::{Resolution, SubmissionOutcome};

use futures_util::FutureExt;
use rust_decimal::Decimal;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{FlowError, ValidationError};
use crate::forwarder::Forwarder;
use crate::notify::{CriticalReport, CriticalSink, FailureStage, Notifier};
use crate::request::{ApprovalRequest, Submission};
use crate::router::{Decision, route};
use crate::token::{ApprovalLinks, TokenIntent, TokenStore, TokenValue};

// ============================================================================
// Settings
// ============================================================================

/// Values the flow needs from configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Page that receives `?token=` visits; required to initiate approvals
    pub base_url: Option<String>,
    /// Lifetime of each approve/deny pair
    pub token_ttl: Duration,
    /// Largest amount approved without a manager
    pub threshold: Decimal,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            token_ttl: Duration::from_secs(6 * 3600),
            threshold: Decimal::from(20),
        }
    }
}

// ============================================================================
// Approval Flow
// ============================================================================

/// Orchestrates routing, token issue, resolution, forwarding and
/// notification.
pub struct ApprovalFlow {
    settings: FlowSettings,
    store: Arc<TokenStore>,
    forwarder: Arc<dyn Forwarder>,
    notifier: Notifier,
    critical: Arc<dyn CriticalSink>,
}

impl std::fmt::Debug for ApprovalFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalFlow")
            .field("settings", &self.settings)
            .field("store", &self.store)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

impl ApprovalFlow {
    /// Creates a flow from its collaborators.
    #[must_use]
    pub fn new(
        settings: FlowSettings,
        store: Arc<TokenStore>,
        forwarder: Arc<dyn Forwarder>,
        notifier: Notifier,
        critical: Arc<dyn CriticalSink>,
    ) -> Self {
        Self {
            settings,
            store,
            forwarder,
            notifier,
            critical,
        }
    }

    /// Returns the flow settings.
    #[must_use]
    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Returns the shared token store.
    #[must_use]
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    /// Entry point for form submissions. Never panics and never errors.
    pub async fn handle_submission(&self, submission: Submission) -> SubmissionOutcome {
        match AssertUnwindSafe(self.submit(&submission))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.report_panic("submission", message).await;
                SubmissionOutcome::Failed
            }
        }
    }

    /// Entry point for link visits. Never panics and never errors.
    pub async fn handle_link(&self, token: Option<String>) -> Resolution {
        match AssertUnwindSafe(self.resolve(token.as_deref()))
            .catch_unwind()
            .await
        {
            Ok(resolution) => resolution,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.report_panic("link visit", message).await;
                Resolution::Error
            }
        }
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    /// Rejects a submission whose body could not be decoded into fields.
    ///
    /// Reported to the operator like any other validation failure.
    pub async fn reject_unreadable(&self, reason: impl Into<String>) -> SubmissionOutcome {
        self.reject(FlowError::Validation(ValidationError::UnreadableForm {
            reason: reason.into(),
        }))
        .await
    }

    async fn reject(&self, err: FlowError) -> SubmissionOutcome {
        warn!(error = %err, "Submission rejected");
        self.report(CriticalReport::new(
            FailureStage::Submission,
            format!("Submission rejected: {err}"),
        ))
        .await;
        SubmissionOutcome::Rejected
    }

    /// Validates, routes and processes a submission.
    pub async fn submit(&self, submission: &Submission) -> SubmissionOutcome {
        let (request, manager_email) = match submission.validate() {
            Ok(validated) => validated,
            Err(e) => return self.reject(FlowError::Validation(e)).await,
        };

        let decision = route(&request, self.settings.threshold);
        info!(
            decision = %decision,
            budget = %request.display_budget(),
            module = %request.module(),
            "Submission routed"
        );

        match decision {
            Decision::AutoApprove => {
                if let Err(e) = self.forward(&request).await {
                    self.report(
                        CriticalReport::new(
                            FailureStage::Forwarding,
                            format!("Auto-approved request was not forwarded: {}", describe(&e)),
                        )
                        .with_request(&request),
                    )
                    .await;
                    return SubmissionOutcome::Failed;
                }
                if let Err(e) = self.notifier.auto_approved(&request).await {
                    self.report(
                        CriticalReport::new(
                            FailureStage::Notification,
                            format!("Submitter was not told about auto-approval: {e}"),
                        )
                        .with_request(&request),
                    )
                    .await;
                }
                SubmissionOutcome::AutoApproved
            }
            Decision::RequiresApproval => match self.initiate(&request, &manager_email).await {
                Ok(_) => SubmissionOutcome::PendingApproval,
                Err(e) => {
                    self.report(
                        CriticalReport::new(
                            FailureStage::Initiation,
                            format!("Approval could not be initiated: {}", describe(&e)),
                        )
                        .with_request(&request),
                    )
                    .await;
                    SubmissionOutcome::Failed
                }
            },
        }
    }

    /// Issues an approve/deny pair and emails the manager both links.
    ///
    /// # Errors
    ///
    /// - `FlowError::ConfigurationMissing` if no base URL is configured;
    ///   nothing is stored in that case
    /// - `FlowError::InvalidLink` if the base URL cannot carry a query
    /// - `FlowError::Store` if the pair cannot be stored
    /// - `FlowError::Notification` if the manager email fails; the pair is
    ///   revoked first
    pub async fn initiate(
        &self,
        request: &ApprovalRequest,
        manager_email: &str,
    ) -> Result<ApprovalLinks, FlowError> {
        let base_url = self
            .settings
            .base_url
            .as_deref()
            .ok_or(FlowError::ConfigurationMissing {
                key: "links.base_url",
            })?;

        let approve = TokenValue::generate(TokenIntent::Approve);
        let deny = TokenValue::generate(TokenIntent::Deny);
        let links = ApprovalLinks {
            approve_url: build_link(base_url, &approve)?,
            deny_url: build_link(base_url, &deny)?,
        };

        self.store
            .put_pair(approve.clone(), deny, request, self.settings.token_ttl)?;

        if let Err(e) = self
            .notifier
            .approval_required(request, manager_email, &links)
            .await
        {
            self.store.revoke_pair(&approve);
            return Err(e.into());
        }

        info!(
            token = %approve.redacted(),
            budget = %request.display_budget(),
            module = %request.module(),
            "Approval requested from manager"
        );
        Ok(links)
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// Resolves a link visit. The token is consumed before any side effect.
    pub async fn resolve(&self, token: Option<&str>) -> Resolution {
        let Some(raw) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            info!("Approval link visited without a token");
            return Resolution::Invalid;
        };
        let Some(value) = TokenValue::parse(raw) else {
            info!("Approval link visited with a malformed token");
            return Resolution::Invalid;
        };

        let stored = match self.store.get_and_invalidate(&value) {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                info!(token = %value.redacted(), "Token expired or already used");
                return Resolution::Expired;
            }
            Err(e) => {
                self.report(CriticalReport::new(
                    FailureStage::Resolution,
                    format!("Consumed token {} could not be read: {e}", value.redacted()),
                ))
                .await;
                return Resolution::Error;
            }
        };

        debug!(token_intent = %stored.intent(), token = %value.redacted(), "Token consumed");
        match stored.intent() {
            TokenIntent::Approve => self.complete_approval(&stored.request).await,
            TokenIntent::Deny => self.complete_denial(&stored.request).await,
        }
    }

    async fn complete_approval(&self, request: &ApprovalRequest) -> Resolution {
        if let Err(e) = self.forward(request).await {
            self.report(
                CriticalReport::new(
                    FailureStage::Forwarding,
                    format!(
                        "Approved request was not forwarded and needs a manual retry: {}",
                        describe(&e)
                    ),
                )
                .with_request(request),
            )
            .await;
            return Resolution::Error;
        }

        if let Err(e) = self.notifier.approved(request).await {
            self.report(
                CriticalReport::new(
                    FailureStage::Notification,
                    format!("Submitter was not told about approval: {e}"),
                )
                .with_request(request),
            )
            .await;
        }
        info!(budget = %request.display_budget(), module = %request.module(), "Request approved");
        Resolution::Approved
    }

    async fn complete_denial(&self, request: &ApprovalRequest) -> Resolution {
        if let Err(e) = self.notifier.denied(request).await {
            self.report(
                CriticalReport::new(
                    FailureStage::Notification,
                    format!("Submitter was not told about denial: {e}"),
                )
                .with_request(request),
            )
            .await;
        }
        info!(budget = %request.display_budget(), module = %request.module(), "Request denied");
        Resolution::Denied
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn forward(&self, request: &ApprovalRequest) -> Result<(), FlowError> {
        let response = self.forwarder.forward(request).await?;
        if !response.is_success() {
            return Err(FlowError::Downstream {
                status: response.status,
                body: response.body,
            });
        }
        Ok(())
    }

    async fn report(&self, report: CriticalReport) {
        self.critical.report_critical(report).await;
    }

    async fn report_panic(&self, entry_point: &'static str, message: String) {
        error!(entry_point = entry_point, panic_message = %message, "Entry point panicked");
        self.report(CriticalReport::new(
            FailureStage::Panic,
            format!("Panic while handling {entry_point}: {message}"),
        ))
        .await;
    }
}

/// Appends `token=<value>` to the base URL, keeping any existing query.
fn build_link(base_url: &str, token: &TokenValue) -> Result<String, FlowError> {
    let mut url = reqwest::Url::parse(base_url).map_err(|e| FlowError::InvalidLink {
        details: format!("'{base_url}': {e}"),
    })?;
    if url.cannot_be_a_base() {
        return Err(FlowError::InvalidLink {
            details: format!("'{base_url}' cannot carry a query"),
        });
    }
    url.query_pairs_mut().append_pair("token", token.as_str());
    Ok(url.to_string())
}

/// Error text for operator reports, including the downstream body.
fn describe(err: &FlowError) -> String {
    match err {
        FlowError::Downstream { status, body } => {
            format!("downstream endpoint returned HTTP {status}: {body}")
        }
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

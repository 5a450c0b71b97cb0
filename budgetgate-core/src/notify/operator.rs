//! Operator alert channel backed by a [`Mailer`].

use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

use super::{CriticalReport, CriticalSink, Mailer, templates};

/// Logs every critical report at ERROR and emails it to the operator.
///
/// Delivery failures are logged and swallowed; the report itself is always
/// in the log.
pub struct MailCriticalSink {
    mailer: Arc<dyn Mailer>,
    operator_email: String,
}

impl std::fmt::Debug for MailCriticalSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailCriticalSink")
            .field("mailer", &self.mailer.name())
            .field("operator_email", &self.operator_email)
            .finish()
    }
}

impl MailCriticalSink {
    /// Creates a sink delivering to `operator_email`.
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, operator_email: impl Into<String>) -> Self {
        Self {
            mailer,
            operator_email: operator_email.into(),
        }
    }
}

#[async_trait]
impl CriticalSink for MailCriticalSink {
    async fn report_critical(&self, report: CriticalReport) {
        match &report.request {
            Some(request) => error!(
                stage = %report.stage,
                submitter = %request.submitter_email(),
                budget = %request.display_budget(),
                module = %request.module(),
                message = %report.message,
                "Critical failure"
            ),
            None => error!(
                stage = %report.stage,
                message = %report.message,
                "Critical failure"
            ),
        }

        let message = templates::critical(&report, &self.operator_email);
        if let Err(e) = self.mailer.send(&message).await {
            error!(
                stage = %report.stage,
                error = %e,
                mailer = self.mailer.name(),
                "Failed to deliver critical report to operator"
            );
        }
    }
}

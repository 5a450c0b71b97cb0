//! Outcome notifications for submitters and managers.

use std::sync::Arc;
use tracing::info;

use super::{EmailMessage, MailError, Mailer, templates};
use crate::request::ApprovalRequest;
use crate::token::ApprovalLinks;

/// Composes and sends workflow emails through a [`Mailer`].
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("mailer", &self.mailer.name())
            .finish()
    }
}

impl Notifier {
    /// Creates a notifier sending through `mailer`.
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Tells the submitter an in-threshold request was processed.
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the message could not be sent.
    pub async fn auto_approved(&self, request: &ApprovalRequest) -> Result<(), MailError> {
        self.deliver("auto_approved", templates::auto_approved(request))
            .await
    }

    /// Tells the submitter the manager approved the request.
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the message could not be sent.
    pub async fn approved(&self, request: &ApprovalRequest) -> Result<(), MailError> {
        self.deliver("approved", templates::approved(request)).await
    }

    /// Tells the submitter the manager denied the request.
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the message could not be sent.
    pub async fn denied(&self, request: &ApprovalRequest) -> Result<(), MailError> {
        self.deliver("denied", templates::denied(request)).await
    }

    /// Sends the manager both single-use links.
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the message could not be sent.
    pub async fn approval_required(
        &self,
        request: &ApprovalRequest,
        manager_email: &str,
        links: &ApprovalLinks,
    ) -> Result<(), MailError> {
        self.deliver(
            "approval_required",
            templates::approval_required(request, manager_email, links),
        )
        .await
    }

    async fn deliver(&self, kind: &'static str, message: EmailMessage) -> Result<(), MailError> {
        self.mailer.send(&message).await?;
        info!(
            kind = kind,
            to = %message.to,
            mailer = self.mailer.name(),
            "Notification sent"
        );
        Ok(())
    }
}

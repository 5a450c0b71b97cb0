//! Log-only mailer for local development.
//!
//! Writes message metadata to the log and reports success. Bodies are never
//! logged since they carry single-use links.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

use super::{EmailMessage, MailError, Mailer};

/// Mailer that logs instead of sending.
#[derive(Debug, Default)]
pub struct LogMailer {
    sent_count: AtomicU32,
}

impl LogMailer {
    /// Creates a log mailer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages "sent" so far.
    #[must_use]
    pub fn sent_count(&self) -> u32 {
        self.sent_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.sent_count.fetch_add(1, Ordering::Relaxed);
        info!(
            to = %message.to,
            subject = %message.subject,
            html_len = message.html.len(),
            "Email not delivered (log transport)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

//! Fixed outcomes reported to the two entry points.

use serde::{Deserialize, Serialize};

/// Terminal outcome of visiting an approval link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Request approved and forwarded downstream
    Approved,
    /// Request denied; submitter notified
    Denied,
    /// Token unknown, already used, or past its TTL
    Expired,
    /// No token, or a value that was never a token
    Invalid,
    /// Processing failed after the token was consumed
    Error,
}

impl Resolution {
    /// Expired and Invalid are shown to the visitor as the same page.
    #[must_use]
    pub fn is_dead_link(&self) -> bool {
        matches!(self, Self::Expired | Self::Invalid)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Expired => "expired",
            Self::Invalid => "invalid",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Outcome of a form submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Within threshold; forwarded downstream
    AutoApproved,
    /// Manager emailed with approve/deny links
    PendingApproval,
    /// Validation failed
    Rejected,
    /// Forwarding or initiation failed; operator notified
    Failed,
}

impl std::fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AutoApproved => "auto_approved",
            Self::PendingApproval => "pending_approval",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

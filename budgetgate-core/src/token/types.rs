//! Token domain types: values, intents, stored entries and links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::ApprovalRequest;

/// Length of the random nanoid body (excluding the intent prefix).
pub const TOKEN_BODY_LENGTH: usize = 21;

/// Number of body characters kept when a token is written to logs.
const REDACTED_VISIBLE_CHARS: usize = 4;

// ============================================================================
// Token Intent
// ============================================================================

/// What following a token's link does to the pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenIntent {
    /// Approve the request and forward it downstream
    Approve,
    /// Deny the request and notify the submitter
    Deny,
}

impl TokenIntent {
    /// Textual prefix carried by token values of this intent.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Approve => "approve-",
            Self::Deny => "deny-",
        }
    }
}

impl std::fmt::Display for TokenIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approve => write!(f, "approve"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

// ============================================================================
// Token Value
// ============================================================================

/// A single-use token value such as `approve-V1StGXR8_Z5jdHi6B-myT`.
///
/// The intent is held as a tagged field. The textual prefix exists only on
/// the wire and is checked once, in [`TokenValue::parse`].
///
/// `Debug` and [`TokenValue::redacted`] never print the full secret.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenValue {
    intent: TokenIntent,
    raw: String,
}

impl TokenValue {
    /// Generates a fresh random token for the given intent.
    ///
    /// The nanoid body gives ~126 bits of randomness, so values are
    /// unguessable and collisions are not a practical concern.
    #[must_use]
    pub fn generate(intent: TokenIntent) -> Self {
        let body = nanoid::nanoid!(TOKEN_BODY_LENGTH);
        Self {
            intent,
            raw: format!("{}{}", intent.prefix(), body),
        }
    }

    /// Parses a token received from a link.
    ///
    /// Returns `None` for anything that does not carry a recognized intent
    /// prefix followed by a well-formed body. Such values were never issued
    /// and must not reach the store.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (intent, body) = if let Some(body) = raw.strip_prefix(TokenIntent::Approve.prefix()) {
            (TokenIntent::Approve, body)
        } else if let Some(body) = raw.strip_prefix(TokenIntent::Deny.prefix()) {
            (TokenIntent::Deny, body)
        } else {
            return None;
        };

        let well_formed = body.len() == TOKEN_BODY_LENGTH
            && body
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !well_formed {
            return None;
        }

        Some(Self {
            intent,
            raw: raw.to_string(),
        })
    }

    /// The intent this token resolves to.
    #[must_use]
    pub fn intent(&self) -> TokenIntent {
        self.intent
    }

    /// Full token value, for building links only.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Log-safe form: prefix plus the first few body characters.
    #[must_use]
    pub fn redacted(&self) -> String {
        let prefix = self.intent.prefix();
        let visible: String = self.raw[prefix.len()..]
            .chars()
            .take(REDACTED_VISIBLE_CHARS)
            .collect();
        format!("{prefix}{visible}…")
    }
}

impl std::fmt::Debug for TokenValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValue")
            .field("intent", &self.intent)
            .field("raw", &self.redacted())
            .finish()
    }
}

// ============================================================================
// Stored Token
// ============================================================================

/// A token retrieved (and thereby consumed) from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    /// The token that was consumed
    pub value: TokenValue,
    /// The request it was issued for, deserialized from the stored payload
    pub request: ApprovalRequest,
    /// When the token would have expired
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    /// Intent of the consumed token.
    #[must_use]
    pub fn intent(&self) -> TokenIntent {
        self.value.intent()
    }
}

// ============================================================================
// Approval Links
// ============================================================================

/// The two single-use links emailed to a manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalLinks {
    /// Link that approves the request
    pub approve_url: String,
    /// Link that denies the request
    pub deny_url: String,
}

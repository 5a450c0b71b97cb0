//! Budget request types: raw form submissions and the validated request.
//!
//! A [`Submission`] is whatever the form collaborator handed us. It is
//! validated exactly once into an [`ApprovalRequest`], which is immutable and
//! travels by value from the router to the forwarder or the token store.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::ValidationError;

/// Module name used when the submitter leaves the field empty.
pub const MODULE_PLACEHOLDER: &str = "Not specified";

// SAFETY: .expect() on LazyLock with a compile-time literal regex pattern.
// The pattern is known-valid and exercised by the tests below.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Returns true if the value looks like an email address.
#[must_use]
pub fn is_email_shaped(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

// ============================================================================
// Submission
// ============================================================================

/// Raw submission fields as received from the form.
///
/// Every field is optional here; [`Submission::validate`] decides which
/// absences are fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Submission {
    /// Email of the person requesting the budget
    #[serde(default)]
    pub submitter_email: Option<String>,
    /// Requested amount as typed (e.g. "15", "1200.50")
    #[serde(default)]
    pub budget: Option<String>,
    /// Free-text module / cost centre
    #[serde(default)]
    pub module: Option<String>,
    /// Email of the manager who approves large requests
    #[serde(default)]
    pub manager_email: Option<String>,
}

impl Submission {
    /// Validates the raw fields into a request plus the manager address.
    ///
    /// Unparseable budgets are rejected rather than treated as zero, so a
    /// malformed amount can never fall through to auto-approval.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<(ApprovalRequest, String), ValidationError> {
        let submitter_email =
            non_blank(&self.submitter_email).ok_or(ValidationError::MissingSubmitterEmail)?;
        if !is_email_shaped(submitter_email) {
            return Err(ValidationError::InvalidEmail {
                field: "submitter_email",
                value: submitter_email.to_string(),
            });
        }

        let manager_email =
            non_blank(&self.manager_email).ok_or(ValidationError::MissingManagerEmail)?;
        if !is_email_shaped(manager_email) {
            return Err(ValidationError::InvalidEmail {
                field: "manager_email",
                value: manager_email.to_string(),
            });
        }

        let raw_budget = non_blank(&self.budget).ok_or(ValidationError::MissingBudget)?;
        let budget = parse_budget(raw_budget)?;

        let module = non_blank(&self.module).unwrap_or(MODULE_PLACEHOLDER);

        let request = ApprovalRequest::new(submitter_email, budget, module)?;
        Ok((request, manager_email.to_string()))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parses a budget amount, tolerating a leading currency sign and
/// thousands separators ("$1,200.50").
fn parse_budget(raw: &str) -> Result<Decimal, ValidationError> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    Decimal::from_str(cleaned.trim()).map_err(|_| ValidationError::MalformedBudget {
        raw: raw.to_string(),
    })
}

// ============================================================================
// Approval Request
// ============================================================================

/// A validated budget request.
///
/// Immutable once constructed: fields are private and exposed through
/// accessors only. Serialized with camelCase names when stored as a token
/// payload; deserialization goes through [`ApprovalRequest::new`], so a
/// decoded request holds the same invariants as a constructed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredRequest")]
pub struct ApprovalRequest {
    submitter_email: String,
    budget: Decimal,
    module: String,
}

/// Wire shape of a stored payload, before invariants are checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRequest {
    submitter_email: String,
    budget: Decimal,
    module: String,
}

impl TryFrom<StoredRequest> for ApprovalRequest {
    type Error = ValidationError;

    fn try_from(raw: StoredRequest) -> Result<Self, Self::Error> {
        Self::new(raw.submitter_email, raw.budget, raw.module)
    }
}

impl ApprovalRequest {
    /// Creates a request, enforcing the non-empty email and non-negative
    /// budget invariants.
    ///
    /// # Errors
    ///
    /// - `ValidationError::MissingSubmitterEmail` for a blank email
    /// - `ValidationError::InvalidEmail` for a non email-shaped address
    /// - `ValidationError::NegativeBudget` for amounts below zero
    pub fn new(
        submitter_email: impl Into<String>,
        budget: Decimal,
        module: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let submitter_email = submitter_email.into();
        if submitter_email.trim().is_empty() {
            return Err(ValidationError::MissingSubmitterEmail);
        }
        if !is_email_shaped(&submitter_email) {
            return Err(ValidationError::InvalidEmail {
                field: "submitter_email",
                value: submitter_email,
            });
        }
        if budget.is_sign_negative() && !budget.is_zero() {
            return Err(ValidationError::NegativeBudget { budget });
        }

        let module = module.into();
        let module = if module.trim().is_empty() {
            MODULE_PLACEHOLDER.to_string()
        } else {
            module
        };

        Ok(Self {
            submitter_email,
            budget,
            module,
        })
    }

    /// Email of the requester.
    #[must_use]
    pub fn submitter_email(&self) -> &str {
        &self.submitter_email
    }

    /// Requested amount.
    #[must_use]
    pub fn budget(&self) -> Decimal {
        self.budget
    }

    /// Module / cost centre.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Budget formatted with two decimals for humans ("1200.50").
    #[must_use]
    pub fn display_budget(&self) -> String {
        format!("{:.2}", self.budget.round_dp(2))
    }

    /// Budget in the normalized textual form sent downstream ("15", "12.5").
    #[must_use]
    pub fn wire_budget(&self) -> String {
        self.budget.normalize().to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn submission(budget: &str) -> Submission {
        Submission {
            submitter_email: Some("alice@example.com".to_string()),
            budget: Some(budget.to_string()),
            module: Some("Platform".to_string()),
            manager_email: Some("boss@example.com".to_string()),
        }
    }

    #[test]
    fn test_validate_happy_path() {
        let (request, manager) = submission("15").validate().unwrap();
        assert_eq!(request.submitter_email(), "alice@example.com");
        assert_eq!(request.budget(), d("15"));
        assert_eq!(request.module(), "Platform");
        assert_eq!(manager, "boss@example.com");
    }

    #[test]
    fn test_validate_trims_fields() {
        let mut s = submission(" 42 ");
        s.submitter_email = Some("  alice@example.com ".to_string());
        let (request, _) = s.validate().unwrap();
        assert_eq!(request.submitter_email(), "alice@example.com");
        assert_eq!(request.budget(), d("42"));
    }

    #[test]
    fn test_missing_submitter_email_is_rejected() {
        let mut s = submission("15");
        s.submitter_email = None;
        assert_eq!(s.validate(), Err(ValidationError::MissingSubmitterEmail));

        s.submitter_email = Some("   ".to_string());
        assert_eq!(s.validate(), Err(ValidationError::MissingSubmitterEmail));
    }

    #[test]
    fn test_missing_manager_email_is_rejected() {
        let mut s = submission("15");
        s.manager_email = None;
        assert_eq!(s.validate(), Err(ValidationError::MissingManagerEmail));
    }

    #[test]
    fn test_invalid_email_shape() {
        let mut s = submission("15");
        s.submitter_email = Some("not-an-email".to_string());
        assert!(matches!(
            s.validate(),
            Err(ValidationError::InvalidEmail {
                field: "submitter_email",
                ..
            })
        ));
    }

    #[test]
    fn test_malformed_budget_fails_closed() {
        let result = submission("twelve").validate();
        assert_eq!(
            result,
            Err(ValidationError::MalformedBudget {
                raw: "twelve".to_string()
            })
        );
    }

    #[test]
    fn test_missing_budget_is_rejected() {
        let mut s = submission("15");
        s.budget = Some(String::new());
        assert_eq!(s.validate(), Err(ValidationError::MissingBudget));
    }

    #[test]
    fn test_negative_budget_is_rejected() {
        assert!(matches!(
            submission("-5").validate(),
            Err(ValidationError::NegativeBudget { .. })
        ));
    }

    #[test]
    fn test_currency_formatting_is_tolerated() {
        let (request, _) = submission("$1,200.50").validate().unwrap();
        assert_eq!(request.budget(), d("1200.50"));
    }

    #[test]
    fn test_module_defaults_to_placeholder() {
        let mut s = submission("15");
        s.module = None;
        let (request, _) = s.validate().unwrap();
        assert_eq!(request.module(), MODULE_PLACEHOLDER);
    }

    #[test]
    fn test_budget_formatting() {
        let request = ApprovalRequest::new("a@b.io", d("15"), "m").unwrap();
        assert_eq!(request.display_budget(), "15.00");
        assert_eq!(request.wire_budget(), "15");

        let request = ApprovalRequest::new("a@b.io", d("12.50"), "m").unwrap();
        assert_eq!(request.display_budget(), "12.50");
        assert_eq!(request.wire_budget(), "12.5");
    }

    #[test]
    fn test_serialized_field_names() {
        let request = ApprovalRequest::new("a@b.io", d("50"), "Ops").unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["submitterEmail"], "a@b.io");
        assert_eq!(json["module"], "Ops");
        assert!(json.get("budget").is_some());
    }

    #[test]
    fn test_deserialize_enforces_invariants() {
        let request = ApprovalRequest::new("a@b.io", d("50"), "Ops").unwrap();
        let json = serde_json::to_string(&request).unwrap();
        let decoded: ApprovalRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, request);

        let bad_email = r#"{"submitterEmail":"nobody","budget":"5","module":"Ops"}"#;
        assert!(serde_json::from_str::<ApprovalRequest>(bad_email).is_err());

        let negative = r#"{"submitterEmail":"a@b.io","budget":"-5","module":"Ops"}"#;
        let err = serde_json::from_str::<ApprovalRequest>(negative).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }
}

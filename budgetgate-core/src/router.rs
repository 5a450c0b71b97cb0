//! Threshold routing between auto-approval and manager approval.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::request::ApprovalRequest;

/// Routing decision for a validated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Amount is within the threshold; process immediately.
    AutoApprove,
    /// Amount exceeds the threshold; a manager must decide.
    RequiresApproval,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoApprove => write!(f, "auto_approve"),
            Self::RequiresApproval => write!(f, "requires_approval"),
        }
    }
}

/// Routes a request against the auto-approval threshold.
///
/// An amount exactly equal to the threshold is auto-approved.
#[must_use]
pub fn route(request: &ApprovalRequest, threshold: Decimal) -> Decision {
    if request.budget() <= threshold {
        Decision::AutoApprove
    } else {
        Decision::RequiresApproval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(budget: Decimal) -> ApprovalRequest {
        ApprovalRequest::new("alice@example.com", budget, "Platform").unwrap()
    }

    #[test]
    fn test_below_threshold_auto_approves() {
        assert_eq!(
            route(&request(Decimal::from(15)), Decimal::from(20)),
            Decision::AutoApprove
        );
    }

    #[test]
    fn test_above_threshold_requires_approval() {
        assert_eq!(
            route(&request(Decimal::from(50)), Decimal::from(20)),
            Decision::RequiresApproval
        );
    }

    #[test]
    fn test_equal_to_threshold_auto_approves() {
        assert_eq!(
            route(&request(Decimal::from(20)), Decimal::from(20)),
            Decision::AutoApprove
        );
    }

    #[test]
    fn test_one_cent_over_requires_approval() {
        assert_eq!(
            route(&request(Decimal::new(2001, 2)), Decimal::from(20)),
            Decision::RequiresApproval
        );
    }

    #[test]
    fn test_zero_threshold() {
        assert_eq!(
            route(&request(Decimal::ZERO), Decimal::ZERO),
            Decision::AutoApprove
        );
        assert_eq!(
            route(&request(Decimal::new(1, 2)), Decimal::ZERO),
            Decision::RequiresApproval
        );
    }

    proptest! {
        #[test]
        fn prop_auto_approve_iff_within_threshold(
            cents in 0i64..10_000_000,
            threshold_cents in 0i64..10_000_000,
        ) {
            let budget = Decimal::new(cents, 2);
            let threshold = Decimal::new(threshold_cents, 2);
            let decision = route(&request(budget), threshold);
            prop_assert_eq!(decision == Decision::AutoApprove, budget <= threshold);
        }
    }
}

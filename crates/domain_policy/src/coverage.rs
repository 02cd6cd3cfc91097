//! Coverage Calculator
//!
//! Pure functions mapping a requested amount and a set of policies to a
//! coverage split. Nothing here touches storage or mutates a policy; the
//! figures are estimates until a claim freezes them at submission.
//!
//! Verification aggregates across every usable policy a patient holds,
//! while a claim is always split against exactly one policy.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{Money, Percentage, PolicyId};

use crate::policy::{CoverageType, Policy};

/// One policy's share of a verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyContribution {
    pub policy_id: PolicyId,
    pub insurer_name: String,
    pub policy_number: String,
    pub coverage_type: CoverageType,
    pub coverage_percentage: Percentage,
    pub remaining_budget: Money,
    pub potential_coverage: Money,
}

/// Result of a read-only coverage verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageVerification {
    pub covered: bool,
    pub requested_amount: Money,
    pub insurance_share: Money,
    pub patient_share: Money,
    /// Sum of contributions before capping at the requested amount
    pub total_coverage: Money,
    pub contributions: Vec<PolicyContribution>,
}

impl CoverageVerification {
    /// Result for a patient with no usable policy
    pub fn uncovered(requested_amount: Money) -> Self {
        Self {
            covered: false,
            requested_amount,
            insurance_share: Money::zero(),
            patient_share: requested_amount,
            total_coverage: Money::zero(),
            contributions: Vec::new(),
        }
    }
}

/// Split of one invoice against one policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSplit {
    pub covered_amount: Money,
    pub patient_share: Money,
    /// Budget snapshot the split was computed against
    pub remaining_budget: Money,
}

/// `min(amount * pct, remaining)`, floored at zero
pub fn policy_coverage(amount: Money, percentage: Percentage, remaining_budget: Money) -> Money {
    amount.percentage_of(percentage).min(remaining_budget).floor_zero()
}

/// Aggregates coverage for `requested_amount` across `policies`
///
/// Policies that are not usable on `today` are ignored. Each remaining
/// policy contributes independently; the insurance share is capped at the
/// requested amount.
pub fn verify(requested_amount: Money, policies: &[Policy], today: NaiveDate) -> CoverageVerification {
    let contributions: Vec<PolicyContribution> = policies
        .iter()
        .filter(|p| p.is_usable_on(today))
        .map(|p| {
            let remaining_budget = p.remaining_budget();
            PolicyContribution {
                policy_id: p.id,
                insurer_name: p.insurer_name.clone(),
                policy_number: p.policy_number.clone(),
                coverage_type: p.coverage_type,
                coverage_percentage: p.coverage_percentage,
                remaining_budget,
                potential_coverage: policy_coverage(requested_amount, p.coverage_percentage, remaining_budget),
            }
        })
        .collect();

    if contributions.is_empty() {
        return CoverageVerification::uncovered(requested_amount);
    }

    let total_coverage: Money = contributions.iter().map(|c| c.potential_coverage).sum();

    CoverageVerification {
        covered: total_coverage.is_positive(),
        requested_amount,
        insurance_share: total_coverage.min(requested_amount),
        patient_share: requested_amount.saturating_sub(total_coverage),
        total_coverage,
        contributions,
    }
}

/// Splits an invoice total against a single policy's current budget
pub fn split_for_claim(total_amount: Money, policy: &Policy) -> CoverageSplit {
    let remaining_budget = policy.remaining_budget();
    let covered_amount = policy_coverage(total_amount, policy.coverage_percentage, remaining_budget);
    CoverageSplit {
        covered_amount,
        patient_share: total_amount - covered_amount,
        remaining_budget,
    }
}

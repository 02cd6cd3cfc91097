//! Custom Test Assertions
//!
//! Assertion helpers for the ledger invariants, with messages that show the
//! offending amounts.

use core_kernel::Money;
use domain_claims::{Claim, ClaimStatus};
use domain_policy::Policy;

/// Asserts `covered_amount + patient_share == total_amount`
pub fn assert_split_invariant(claim: &Claim) {
    assert_eq!(
        claim.covered_amount + claim.patient_share,
        claim.total_amount,
        "claim {} split does not add up: covered={} patient={} total={}",
        claim.id,
        claim.covered_amount,
        claim.patient_share,
        claim.total_amount
    );
    assert!(
        !claim.covered_amount.is_negative() && !claim.patient_share.is_negative(),
        "claim {} has a negative share",
        claim.id
    );
}

/// Asserts `used_amount <= max_annual_amount`
pub fn assert_within_budget(policy: &Policy) {
    assert!(
        policy.used_amount <= policy.max_annual_amount,
        "policy {} over budget: used={} max={}",
        policy.policy_number,
        policy.used_amount,
        policy.max_annual_amount
    );
}

/// Asserts the policy's used amount equals the covered total of `approved`
///
/// Holds only for policies that started from zero.
pub fn assert_used_matches_approved(policy: &Policy, claims: &[Claim]) {
    let approved: Money = claims
        .iter()
        .filter(|c| c.policy_id == policy.id && c.status == ClaimStatus::Approved)
        .map(|c| c.covered_amount)
        .sum();

    assert_eq!(
        policy.used_amount, approved,
        "policy {} used amount {} differs from approved total {}",
        policy.policy_number, policy.used_amount, approved
    );
}

/// Asserts terminal claims carry `processed_at` and pending ones do not
pub fn assert_processed_timestamp(claim: &Claim) {
    assert_eq!(
        claim.processed_at.is_some(),
        claim.status.is_terminal(),
        "claim {} in status {} has processed_at={:?}",
        claim.id,
        claim.status,
        claim.processed_at
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{TestClaimBuilder, TestPolicyBuilder};
    use crate::fixtures::TemporalFixtures;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assertions_accept_valid_claim() {
        let policy = TestPolicyBuilder::new().with_percentage(dec!(70)).build();
        let mut claim = Claim::submit(
            TestClaimBuilder::for_policy(policy.id).with_total(dec!(1000)).build(),
            &policy,
            TemporalFixtures::today(),
            Utc::now(),
        )
        .unwrap();

        assert_split_invariant(&claim);
        assert_processed_timestamp(&claim);

        claim.approve(Utc::now()).unwrap();
        assert_processed_timestamp(&claim);
    }

    #[test]
    #[should_panic(expected = "over budget")]
    fn test_within_budget_panics_when_exceeded() {
        let mut policy = TestPolicyBuilder::new().with_max_annual(dec!(100)).build();
        policy.used_amount = Money::new(dec!(100.01));
        assert_within_budget(&policy);
    }
}

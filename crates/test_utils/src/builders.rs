//! Test Data Builders
//!
//! Builders for policies and invoices. Tests set only the fields they care
//! about; everything else defaults to a usable policy covering today.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use core_kernel::{Money, PolicyId};
use domain_claims::NewClaim;
use domain_policy::{CoverageType, NewPolicy, Policy, PolicyStatus};

use crate::fixtures::{PatientFixtures, TemporalFixtures};

/// Builder for policies
#[derive(Debug, Clone)]
pub struct TestPolicyBuilder {
    patient_key: String,
    patient_name: String,
    insurer_name: String,
    policy_number: String,
    coverage_type: CoverageType,
    coverage_percentage: Decimal,
    max_annual_amount: Decimal,
    used_amount: Decimal,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: PolicyStatus,
}

impl Default for TestPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPolicyBuilder {
    pub fn new() -> Self {
        Self {
            patient_key: PatientFixtures::covered().to_string(),
            patient_name: "Ahmed Tounsi".to_string(),
            insurer_name: "CNAM Tunisie".to_string(),
            policy_number: format!("TEST-{}", PolicyId::new_v7()),
            coverage_type: CoverageType::Basic,
            coverage_percentage: dec!(80),
            max_annual_amount: dec!(5000),
            used_amount: Decimal::ZERO,
            start_date: TemporalFixtures::window_start(),
            end_date: TemporalFixtures::window_end(),
            status: PolicyStatus::Active,
        }
    }

    pub fn with_patient_key(mut self, key: impl Into<String>) -> Self {
        self.patient_key = key.into();
        self
    }

    pub fn with_insurer(mut self, name: impl Into<String>) -> Self {
        self.insurer_name = name.into();
        self
    }

    pub fn with_policy_number(mut self, number: impl Into<String>) -> Self {
        self.policy_number = number.into();
        self
    }

    pub fn with_coverage_type(mut self, coverage_type: CoverageType) -> Self {
        self.coverage_type = coverage_type;
        self
    }

    pub fn with_percentage(mut self, pct: Decimal) -> Self {
        self.coverage_percentage = pct;
        self
    }

    pub fn with_max_annual(mut self, amount: Decimal) -> Self {
        self.max_annual_amount = amount;
        self
    }

    /// Sets the amount already consumed this year
    pub fn with_used(mut self, amount: Decimal) -> Self {
        self.used_amount = amount;
        self
    }

    pub fn with_validity(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_status(mut self, status: PolicyStatus) -> Self {
        self.status = status;
        self
    }

    /// Registration request carrying every explicit field
    pub fn registration(&self) -> NewPolicy {
        NewPolicy {
            patient_key: self.patient_key.clone(),
            patient_name: Some(self.patient_name.clone()),
            insurer_name: self.insurer_name.clone(),
            policy_number: self.policy_number.clone(),
            coverage_type: Some(self.coverage_type),
            coverage_percentage: Some(self.coverage_percentage),
            max_annual_amount: Some(self.max_annual_amount),
            start_date: Some(self.start_date),
            end_date: Some(self.end_date),
        }
    }

    /// Builds the policy, applying status and used amount after registration
    ///
    /// # Panics
    ///
    /// Panics if the configured fields break a policy invariant.
    pub fn build(self) -> Policy {
        let mut policy = Policy::register(self.registration(), Utc::now())
            .expect("builder fields must form a valid policy");
        policy.used_amount = Money::non_negative(self.used_amount).expect("used amount must be non-negative");
        policy.status = self.status;
        policy
    }
}

/// Builder for invoices
#[derive(Debug, Clone)]
pub struct TestClaimBuilder {
    policy_id: PolicyId,
    invoice_reference: String,
    total_amount: Decimal,
    line_items: Vec<Value>,
}

impl TestClaimBuilder {
    pub fn for_policy(policy_id: PolicyId) -> Self {
        Self {
            policy_id,
            invoice_reference: format!("INV-{}", uuid::Uuid::now_v7().simple()),
            total_amount: dec!(100),
            line_items: Vec::new(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.invoice_reference = reference.into();
        self
    }

    pub fn with_total(mut self, total: Decimal) -> Self {
        self.total_amount = total;
        self
    }

    pub fn with_line_items(mut self, items: Vec<Value>) -> Self {
        self.line_items = items;
        self
    }

    pub fn build(self) -> NewClaim {
        NewClaim {
            policy_id: self.policy_id,
            invoice_reference: self.invoice_reference,
            total_amount: self.total_amount,
            line_items: self.line_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_builder_defaults() {
        let policy = TestPolicyBuilder::new().build();

        assert_eq!(policy.coverage_percentage.value(), dec!(80));
        assert_eq!(policy.max_annual_amount, Money::new(dec!(5000)));
        assert!(policy.used_amount.is_zero());
        assert!(policy.is_usable_on(TemporalFixtures::today()));
    }

    #[test]
    fn test_policy_builder_overrides() {
        let policy = TestPolicyBuilder::new()
            .with_percentage(dec!(70))
            .with_max_annual(dec!(3000))
            .with_used(dec!(2500))
            .with_status(PolicyStatus::Suspended)
            .build();

        assert_eq!(policy.remaining_budget(), Money::new(dec!(500)));
        assert_eq!(policy.status, PolicyStatus::Suspended);
    }

    #[test]
    fn test_builder_policy_numbers_are_unique() {
        let a = TestPolicyBuilder::new().build();
        let b = TestPolicyBuilder::new().build();
        assert_ne!(a.policy_number, b.policy_number);
    }

    #[test]
    fn test_claim_builder() {
        let policy_id = PolicyId::new_v7();
        let claim = TestClaimBuilder::for_policy(policy_id).with_total(dec!(250)).build();

        assert_eq!(claim.policy_id, policy_id);
        assert_eq!(claim.total_amount, dec!(250));
        assert!(claim.invoice_reference.starts_with("INV-"));
    }
}

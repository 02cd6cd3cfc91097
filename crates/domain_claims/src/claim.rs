//! Claim aggregate
//!
//! A claim applies one policy's coverage to one invoice. The split between
//! insurer and patient is computed once, at submission, against the
//! policy's budget at that instant and is never recomputed.
//!
//! ```text
//! Pending --approve--> Approved
//!         \--reject--> Rejected
//! ```
//!
//! Both outcomes are terminal.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, Money, PolicyId};
use domain_policy::{coverage, Policy, PolicyStatus};

use crate::error::ClaimError;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ClaimStatus::Pending)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ClaimStatus::Pending),
            "approved" => Ok(ClaimStatus::Approved),
            "rejected" => Ok(ClaimStatus::Rejected),
            other => Err(ClaimError::validation(format!("unknown claim status '{}'", other))),
        }
    }
}

/// Invoice data submitted against a policy
#[derive(Debug, Clone, PartialEq)]
pub struct NewClaim {
    pub policy_id: PolicyId,
    pub invoice_reference: String,
    pub total_amount: Decimal,
    /// Stored as received, never interpreted
    pub line_items: Vec<Value>,
}

impl NewClaim {
    /// Checks the invoice fields, returning the normalized reference and total
    pub fn validate(&self) -> Result<(String, Money), ClaimError> {
        let invoice_reference = self.invoice_reference.trim();
        if invoice_reference.is_empty() {
            return Err(ClaimError::MissingRequiredField("invoice_reference".to_string()));
        }
        let total_amount = Money::positive(self.total_amount)?;
        Ok((invoice_reference.to_string(), total_amount))
    }
}

/// A claim against a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub policy_id: PolicyId,
    pub invoice_reference: String,
    pub total_amount: Money,
    /// Insurer's share, frozen at submission
    pub covered_amount: Money,
    pub patient_share: Money,
    #[serde(default)]
    pub line_items: Vec<Value>,
    pub status: ClaimStatus,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Claim {
    /// Creates a pending claim split against `policy`'s current budget
    ///
    /// # Errors
    ///
    /// Invalid invoice fields, or `PolicyInactive` when the policy is not
    /// usable on `today`.
    pub fn submit(
        new_claim: NewClaim,
        policy: &Policy,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Self, ClaimError> {
        let (invoice_reference, total_amount) = new_claim.validate()?;

        let status = policy.effective_status(today);
        if status != PolicyStatus::Active {
            return Err(ClaimError::PolicyInactive {
                policy_id: policy.id.to_string(),
                status: status.to_string(),
            });
        }

        let split = coverage::split_for_claim(total_amount, policy);

        Ok(Self {
            id: ClaimId::new_v7(),
            policy_id: policy.id,
            invoice_reference,
            total_amount,
            covered_amount: split.covered_amount,
            patient_share: split.patient_share,
            line_items: new_claim.line_items,
            status: ClaimStatus::Pending,
            submitted_at: now,
            processed_at: None,
            rejection_reason: None,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == ClaimStatus::Pending
    }

    fn ensure_pending(&self) -> Result<(), ClaimError> {
        if !self.is_pending() {
            return Err(ClaimError::ClaimAlreadyProcessed {
                claim_id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Moves a pending claim to `Approved`
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), ClaimError> {
        self.ensure_pending()?;
        self.status = ClaimStatus::Approved;
        self.processed_at = Some(now);
        Ok(())
    }

    /// Moves a pending claim to `Rejected`
    pub fn reject(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<(), ClaimError> {
        self.ensure_pending()?;
        self.status = ClaimStatus::Rejected;
        self.processed_at = Some(now);
        self.rejection_reason = reason;
        Ok(())
    }

    /// Amount owed to the provider once approved, zero otherwise
    pub fn reimbursable_amount(&self) -> Money {
        match self.status {
            ClaimStatus::Approved => self.covered_amount,
            _ => Money::zero(),
        }
    }
}

/// A claim joined with the policy fields shown in listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimWithPolicy {
    #[serde(flatten)]
    pub claim: Claim,
    pub patient_key: String,
    pub insurer_name: String,
    pub policy_number: String,
}

impl ClaimWithPolicy {
    pub fn new(claim: Claim, policy: &Policy) -> Self {
        Self {
            claim,
            patient_key: policy.patient_key.clone(),
            insurer_name: policy.insurer_name.clone(),
            policy_number: policy.policy_number.clone(),
        }
    }
}

/// Query parameters for listing claims
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimQuery {
    pub policy_id: Option<PolicyId>,
    pub status: Option<ClaimStatus>,
}

impl ClaimQuery {
    pub fn by_policy(policy_id: PolicyId) -> Self {
        Self {
            policy_id: Some(policy_id),
            status: None,
        }
    }

    pub fn with_status(mut self, status: ClaimStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, claim: &Claim) -> bool {
        self.policy_id.map_or(true, |id| claim.policy_id == id)
            && self.status.map_or(true, |s| claim.status == s)
    }
}

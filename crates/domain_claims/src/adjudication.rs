//! Claim adjudication decisions and their outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::Money;

use crate::claim::{Claim, ClaimStatus};
use crate::error::ClaimError;

/// Decision applied to a pending claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjudicationAction {
    Approve,
    Reject,
}

impl AdjudicationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjudicationAction::Approve => "approve",
            AdjudicationAction::Reject => "reject",
        }
    }
}

impl fmt::Display for AdjudicationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjudicationAction {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(AdjudicationAction::Approve),
            "reject" => Ok(AdjudicationAction::Reject),
            _ => Err(ClaimError::UnknownAction(s.to_string())),
        }
    }
}

/// Result of submitting a claim
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub claim: Claim,
    pub message: String,
}

/// Result of processing a claim
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjudicationOutcome {
    pub claim: Claim,
    /// Covered amount if approved, zero if rejected
    pub reimbursable_amount: Money,
    pub message: String,
}

impl AdjudicationOutcome {
    pub fn new(claim: Claim, currency_code: &str) -> Self {
        let message = match claim.status {
            ClaimStatus::Rejected => rejection_message(claim.rejection_reason.as_deref()),
            _ => approval_message(claim.covered_amount, currency_code),
        };
        Self {
            reimbursable_amount: claim.reimbursable_amount(),
            message,
            claim,
        }
    }
}

pub fn submission_message(covered: Money, patient_share: Money, currency_code: &str) -> String {
    format!(
        "Claim submitted. Covered: {} {}, Patient pays: {} {}",
        covered, currency_code, patient_share, currency_code
    )
}

pub fn approval_message(covered: Money, currency_code: &str) -> String {
    format!("Claim approved. {} {} will be reimbursed.", covered, currency_code)
}

pub fn rejection_message(reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("Claim rejected: {}", reason),
        None => "Claim rejected: no reason given".to_string(),
    }
}

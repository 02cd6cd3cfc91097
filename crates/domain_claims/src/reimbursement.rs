//! Reimbursement records
//!
//! A reimbursement is the payout for one approved claim. It is written
//! once and never changed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimId, Money, ReimbursementId};

use crate::claim::{Claim, ClaimStatus};
use crate::error::ClaimError;

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
    Check,
    Cash,
    DirectDeposit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Check => "check",
            PaymentMethod::Cash => "cash",
            PaymentMethod::DirectDeposit => "direct_deposit",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "check" => Ok(PaymentMethod::Check),
            "cash" => Ok(PaymentMethod::Cash),
            "direct_deposit" => Ok(PaymentMethod::DirectDeposit),
            other => Err(ClaimError::validation(format!("unknown payment method '{}'", other))),
        }
    }
}

/// Reimbursement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReimbursementStatus {
    #[default]
    Completed,
}

impl ReimbursementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReimbursementStatus::Completed => "completed",
        }
    }
}

impl FromStr for ReimbursementStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completed" => Ok(ReimbursementStatus::Completed),
            other => Err(ClaimError::validation(format!("unknown reimbursement status '{}'", other))),
        }
    }
}

/// A payout for an approved claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reimbursement {
    pub id: ReimbursementId,
    pub claim_id: ClaimId,
    /// Always the claim's covered amount
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub bank_account: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub status: ReimbursementStatus,
}

impl Reimbursement {
    /// Builds the reimbursement for an approved claim
    pub fn for_claim(
        claim: &Claim,
        payment_method: PaymentMethod,
        bank_account: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ClaimError> {
        if claim.status != ClaimStatus::Approved {
            return Err(ClaimError::ClaimNotApproved {
                claim_id: claim.id.to_string(),
                status: claim.status.to_string(),
            });
        }

        Ok(Self {
            id: ReimbursementId::new_v7(),
            claim_id: claim.id,
            amount: claim.covered_amount,
            payment_method,
            bank_account: bank_account
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            processed_at: now,
            status: ReimbursementStatus::Completed,
        })
    }
}

//! Claims Adjudicator
//!
//! Drives the claim state machine: submission against one policy's budget
//! snapshot, approval or rejection with the atomic budget debit, and the
//! one-per-claim reimbursement record.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{ClaimId, Timezone};
use domain_policy::{mask_patient_key, BudgetEnforcement, PolicyPort};

use crate::adjudication::{submission_message, AdjudicationAction, AdjudicationOutcome, SubmissionReceipt};
use crate::claim::{Claim, ClaimQuery, ClaimWithPolicy, NewClaim};
use crate::error::ClaimError;
use crate::ports::{ClaimsPort, ReimbursementCommit, Transition};
use crate::reimbursement::{PaymentMethod, Reimbursement};

/// Currency label used in messages when none is configured
pub const DEFAULT_CURRENCY_CODE: &str = "TND";

/// Knobs that shape adjudication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjudicationSettings {
    pub budget_enforcement: BudgetEnforcement,
    pub currency_code: String,
    pub timezone: Timezone,
}

impl Default for AdjudicationSettings {
    fn default() -> Self {
        Self {
            budget_enforcement: BudgetEnforcement::default(),
            currency_code: DEFAULT_CURRENCY_CODE.to_string(),
            timezone: Timezone::default(),
        }
    }
}

/// Request to process a pending claim
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessClaim {
    pub action: AdjudicationAction,
    pub rejection_reason: Option<String>,
}

impl ProcessClaim {
    pub fn approve() -> Self {
        Self {
            action: AdjudicationAction::Approve,
            rejection_reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            action: AdjudicationAction::Reject,
            rejection_reason: Some(reason.into()),
        }
    }
}

/// Request to record the payout of an approved claim
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordReimbursement {
    pub payment_method: PaymentMethod,
    pub bank_account: Option<String>,
}

fn log_rejected(operation: &'static str, error: ClaimError) -> ClaimError {
    warn!(operation, error = %error, kind = %error.kind(), "request rejected");
    error
}

#[derive(Clone)]
pub struct ClaimsAdjudicator {
    policies: Arc<dyn PolicyPort>,
    claims: Arc<dyn ClaimsPort>,
    settings: AdjudicationSettings,
}

impl ClaimsAdjudicator {
    pub fn new(
        policies: Arc<dyn PolicyPort>,
        claims: Arc<dyn ClaimsPort>,
        settings: AdjudicationSettings,
    ) -> Self {
        Self {
            policies,
            claims,
            settings,
        }
    }

    pub fn settings(&self) -> &AdjudicationSettings {
        &self.settings
    }

    /// Submits a claim against one policy
    ///
    /// The covered amount is computed from the policy's remaining budget
    /// now and frozen; no budget is debited until approval.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a blank invoice reference or non-positive total
    /// - `PolicyNotFound` if the policy does not exist
    /// - `PolicyInactive` if the policy is not active today
    #[instrument(skip(self, new_claim), fields(policy_id = %new_claim.policy_id, invoice = %new_claim.invoice_reference))]
    pub async fn submit_claim(&self, new_claim: NewClaim) -> Result<SubmissionReceipt, ClaimError> {
        new_claim.validate().map_err(|e| log_rejected("submit_claim", e))?;

        let policy = self.policies.get_policy(new_claim.policy_id).await.map_err(|e| {
            let error = if e.is_not_found() {
                ClaimError::PolicyNotFound(new_claim.policy_id.to_string())
            } else {
                ClaimError::from_port(e)
            };
            log_rejected("submit_claim", error)
        })?;

        let now = Utc::now();
        let claim = Claim::submit(new_claim, &policy, self.settings.timezone.date_of(now), now)
            .map_err(|e| log_rejected("submit_claim", e))?;

        let claim = self.claims.insert_claim(claim).await.map_err(|e| {
            let error = if e.is_not_found() {
                ClaimError::PolicyNotFound(policy.id.to_string())
            } else {
                ClaimError::from_port(e)
            };
            log_rejected("submit_claim", error)
        })?;

        info!(
            claim_id = %claim.id,
            patient = %mask_patient_key(&policy.patient_key),
            total_amount = %claim.total_amount,
            covered_amount = %claim.covered_amount,
            patient_share = %claim.patient_share,
            "claim submitted"
        );

        let message = submission_message(claim.covered_amount, claim.patient_share, &self.settings.currency_code);
        Ok(SubmissionReceipt { claim, message })
    }

    /// Approves or rejects a pending claim
    ///
    /// Approval debits the claim's frozen covered amount from the policy in
    /// the same atomic commit as the status change.
    ///
    /// # Errors
    ///
    /// - `ClaimNotFound` if the claim does not exist
    /// - `ClaimAlreadyProcessed` if it is no longer pending, whatever the action
    /// - `BudgetExceeded` under strict enforcement when the debit would pass the cap
    #[instrument(skip(self, request), fields(claim_id = %claim_id, action = %request.action))]
    pub async fn process_claim(&self, claim_id: ClaimId, request: ProcessClaim) -> Result<AdjudicationOutcome, ClaimError> {
        let current = self.get_claim(claim_id).await.map_err(|e| log_rejected("process_claim", e))?;
        if !current.claim.is_pending() {
            return Err(log_rejected(
                "process_claim",
                ClaimError::ClaimAlreadyProcessed {
                    claim_id: claim_id.to_string(),
                    status: current.claim.status.to_string(),
                },
            ));
        }

        let now = Utc::now();
        let transition = match request.action {
            AdjudicationAction::Approve => {
                self.claims
                    .commit_approval(claim_id, now, self.settings.budget_enforcement)
                    .await
            }
            AdjudicationAction::Reject => {
                let reason = request
                    .rejection_reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty());
                self.claims.commit_rejection(claim_id, reason, now).await
            }
        }
        .map_err(|e| log_rejected("process_claim", self.claim_port_error(claim_id, e)))?;

        let claim = match transition {
            Transition::Applied(claim) => claim,
            Transition::NotPending(status) => {
                return Err(log_rejected(
                    "process_claim",
                    ClaimError::ClaimAlreadyProcessed {
                        claim_id: claim_id.to_string(),
                        status: status.to_string(),
                    },
                ));
            }
            Transition::BudgetExceeded => {
                return Err(log_rejected(
                    "process_claim",
                    ClaimError::BudgetExceeded {
                        policy_id: current.claim.policy_id.to_string(),
                        covered: current.claim.covered_amount,
                    },
                ));
            }
        };

        let outcome = AdjudicationOutcome::new(claim, &self.settings.currency_code);
        info!(
            status = %outcome.claim.status,
            reimbursable_amount = %outcome.reimbursable_amount,
            "claim processed"
        );
        Ok(outcome)
    }

    /// Records the payout of an approved claim, at most once
    ///
    /// # Errors
    ///
    /// - `ClaimNotFound` if the claim does not exist
    /// - `ClaimNotApproved` unless the claim is approved
    /// - `DuplicateReimbursement` if a payout was already recorded
    #[instrument(skip(self, request), fields(claim_id = %claim_id, method = %request.payment_method))]
    pub async fn record_reimbursement(
        &self,
        claim_id: ClaimId,
        request: RecordReimbursement,
    ) -> Result<Reimbursement, ClaimError> {
        let current = self.get_claim(claim_id).await.map_err(|e| log_rejected("record_reimbursement", e))?;
        let reimbursement = Reimbursement::for_claim(&current.claim, request.payment_method, request.bank_account, Utc::now())
            .map_err(|e| log_rejected("record_reimbursement", e))?;

        let commit = self
            .claims
            .record_reimbursement(reimbursement)
            .await
            .map_err(|e| log_rejected("record_reimbursement", self.claim_port_error(claim_id, e)))?;

        match commit {
            ReimbursementCommit::Recorded(reimbursement) => {
                info!(reimbursement_id = %reimbursement.id, amount = %reimbursement.amount, "reimbursement recorded");
                Ok(reimbursement)
            }
            ReimbursementCommit::ClaimNotApproved(status) => Err(log_rejected(
                "record_reimbursement",
                ClaimError::ClaimNotApproved {
                    claim_id: claim_id.to_string(),
                    status: status.to_string(),
                },
            )),
            ReimbursementCommit::Duplicate => Err(log_rejected(
                "record_reimbursement",
                ClaimError::DuplicateReimbursement(claim_id.to_string()),
            )),
        }
    }

    pub async fn get_claim(&self, claim_id: ClaimId) -> Result<ClaimWithPolicy, ClaimError> {
        self.claims
            .get_claim(claim_id)
            .await
            .map_err(|e| self.claim_port_error(claim_id, e))
    }

    pub async fn list_claims(&self, query: ClaimQuery) -> Result<Vec<ClaimWithPolicy>, ClaimError> {
        self.claims.find_claims(query).await.map_err(ClaimError::from_port)
    }

    pub async fn get_reimbursement(&self, claim_id: ClaimId) -> Result<Option<Reimbursement>, ClaimError> {
        self.claims
            .find_reimbursement(claim_id)
            .await
            .map_err(ClaimError::from_port)
    }

    fn claim_port_error(&self, claim_id: ClaimId, error: core_kernel::PortError) -> ClaimError {
        if error.is_not_found() {
            ClaimError::ClaimNotFound(claim_id.to_string())
        } else {
            ClaimError::from_port(error)
        }
    }
}

//! Claims and reimbursement DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use core_kernel::{ClaimId, Money, PolicyId, ReimbursementId};
use domain_claims::{
    AdjudicationAction, AdjudicationOutcome, ClaimError, ClaimStatus, ClaimWithPolicy, NewClaim, PaymentMethod,
    ProcessClaim, RecordReimbursement, Reimbursement, ReimbursementStatus, SubmissionReceipt,
};

use super::{check_upper_bound, invalid};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitClaimRequest {
    pub policy_id: PolicyId,
    #[validate(length(min = 1, message = "invoiceReference is required"))]
    pub invoice_reference: String,
    #[validate(custom(function = "validate_total"))]
    pub total_amount: Decimal,
    #[serde(default)]
    pub line_items: Vec<Value>,
}

fn validate_total(total: &Decimal) -> Result<(), ValidationError> {
    if *total <= Decimal::ZERO {
        return Err(invalid("non_positive_amount", "totalAmount must be greater than zero"));
    }
    check_upper_bound(*total, "totalAmount")
}

impl From<SubmitClaimRequest> for NewClaim {
    fn from(request: SubmitClaimRequest) -> Self {
        NewClaim {
            policy_id: request.policy_id,
            invoice_reference: request.invoice_reference,
            total_amount: request.total_amount,
            line_items: request.line_items,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessClaimRequest {
    #[validate(length(min = 1, message = "action is required"))]
    pub action: String,
    pub rejection_reason: Option<String>,
}

impl ProcessClaimRequest {
    /// Parses the action; anything but `approve` or `reject` is refused
    pub fn into_command(self) -> Result<ProcessClaim, ClaimError> {
        let action: AdjudicationAction = self.action.parse()?;
        let rejection_reason = self
            .rejection_reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        Ok(ProcessClaim {
            action,
            rejection_reason,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReimbursementRequest {
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(max = 64, message = "bankAccount is too long"))]
    pub bank_account: Option<String>,
}

impl From<ReimbursementRequest> for RecordReimbursement {
    fn from(request: ReimbursementRequest) -> Self {
        RecordReimbursement {
            payment_method: request.payment_method.unwrap_or_default(),
            bank_account: request.bank_account,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSubmissionResponse {
    pub claim_id: ClaimId,
    pub status: ClaimStatus,
    pub covered_amount: Money,
    pub patient_share: Money,
    pub message: String,
}

impl From<SubmissionReceipt> for ClaimSubmissionResponse {
    fn from(receipt: SubmissionReceipt) -> Self {
        Self {
            claim_id: receipt.claim.id,
            status: receipt.claim.status,
            covered_amount: receipt.claim.covered_amount,
            patient_share: receipt.claim.patient_share,
            message: receipt.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimProcessingResponse {
    pub claim_id: ClaimId,
    pub status: ClaimStatus,
    /// Reimbursable amount: the covered amount on approval, zero on rejection
    pub covered_amount: Money,
    pub message: String,
}

impl From<AdjudicationOutcome> for ClaimProcessingResponse {
    fn from(outcome: AdjudicationOutcome) -> Self {
        Self {
            claim_id: outcome.claim.id,
            status: outcome.claim.status,
            covered_amount: outcome.reimbursable_amount,
            message: outcome.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub id: ClaimId,
    pub policy_id: PolicyId,
    pub invoice_reference: String,
    pub total_amount: Money,
    pub covered_amount: Money,
    pub patient_share: Money,
    pub line_items: Vec<Value>,
    pub status: ClaimStatus,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub patient_key: String,
    pub insurer_name: String,
    pub policy_number: String,
}

impl From<ClaimWithPolicy> for ClaimResponse {
    fn from(record: ClaimWithPolicy) -> Self {
        let claim = record.claim;
        Self {
            id: claim.id,
            policy_id: claim.policy_id,
            invoice_reference: claim.invoice_reference,
            total_amount: claim.total_amount,
            covered_amount: claim.covered_amount,
            patient_share: claim.patient_share,
            line_items: claim.line_items,
            status: claim.status,
            submitted_at: claim.submitted_at,
            processed_at: claim.processed_at,
            rejection_reason: claim.rejection_reason,
            patient_key: record.patient_key,
            insurer_name: record.insurer_name,
            policy_number: record.policy_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReimbursementResponse {
    pub id: ReimbursementId,
    pub claim_id: ClaimId,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub bank_account: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub status: ReimbursementStatus,
}

impl From<Reimbursement> for ReimbursementResponse {
    fn from(reimbursement: Reimbursement) -> Self {
        Self {
            id: reimbursement.id,
            claim_id: reimbursement.claim_id,
            amount: reimbursement.amount,
            payment_method: reimbursement.payment_method,
            bank_account: reimbursement.bank_account,
            processed_at: reimbursement.processed_at,
            status: reimbursement.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ErrorKind;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_submit_request_defaults_line_items() {
        let request: SubmitClaimRequest = serde_json::from_value(json!({
            "policyId": PolicyId::new_v7(),
            "invoiceReference": "INV-2024-0042",
            "totalAmount": 1000
        }))
        .unwrap();

        assert!(request.validate().is_ok());
        assert!(request.line_items.is_empty());
        assert_eq!(request.total_amount, dec!(1000));
    }

    #[test]
    fn test_submit_request_rejects_zero_total() {
        let request = SubmitClaimRequest {
            policy_id: PolicyId::new_v7(),
            invoice_reference: "INV-1".to_string(),
            total_amount: dec!(0),
            line_items: vec![],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_unknown_action_is_invalid_input() {
        let request = ProcessClaimRequest {
            action: "escalate".to_string(),
            rejection_reason: None,
        };
        let err = request.into_command().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_blank_rejection_reason_dropped() {
        let command = ProcessClaimRequest {
            action: "Reject".to_string(),
            rejection_reason: Some("   ".to_string()),
        }
        .into_command()
        .unwrap();

        assert_eq!(command.action, AdjudicationAction::Reject);
        assert!(command.rejection_reason.is_none());
    }

    #[test]
    fn test_reimbursement_request_defaults_to_bank_transfer() {
        let request: ReimbursementRequest = serde_json::from_value(json!({})).unwrap();
        let command = RecordReimbursement::from(request);
        assert_eq!(command.payment_method, PaymentMethod::BankTransfer);
    }
}

//! Coverage verification DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use core_kernel::{Money, Percentage, PolicyId};
use domain_policy::{CoverageType, PatientCoverage, PolicyContribution};

use super::check_non_negative;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCoverageRequest {
    #[validate(length(min = 1, message = "patientKey is required"))]
    pub patient_key: String,
    #[validate(custom(function = "validate_requested_amount"))]
    pub amount: Decimal,
}

fn validate_requested_amount(amount: &Decimal) -> Result<(), ValidationError> {
    check_non_negative(*amount, "amount")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyContributionResponse {
    pub policy_id: PolicyId,
    pub insurer: String,
    pub policy_number: String,
    pub coverage_type: CoverageType,
    pub coverage_percentage: Percentage,
    pub remaining_budget: Money,
    pub potential_coverage: Money,
}

impl From<PolicyContribution> for PolicyContributionResponse {
    fn from(contribution: PolicyContribution) -> Self {
        Self {
            policy_id: contribution.policy_id,
            insurer: contribution.insurer_name,
            policy_number: contribution.policy_number,
            coverage_type: contribution.coverage_type,
            coverage_percentage: contribution.coverage_percentage,
            remaining_budget: contribution.remaining_budget,
            potential_coverage: contribution.potential_coverage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageVerificationResponse {
    pub patient_key: String,
    pub covered: bool,
    pub requested_amount: Money,
    pub insurance_share: Money,
    pub patient_share: Money,
    pub per_policy_breakdown: Vec<PolicyContributionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<PatientCoverage> for CoverageVerificationResponse {
    fn from(result: PatientCoverage) -> Self {
        let verification = result.verification;
        Self {
            patient_key: result.patient_key,
            covered: verification.covered,
            requested_amount: verification.requested_amount,
            insurance_share: verification.insurance_share,
            patient_share: verification.patient_share,
            per_policy_breakdown: verification.contributions.into_iter().map(Into::into).collect(),
            message: result.message,
        }
    }
}

//! Policy DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use core_kernel::{Money, Percentage, PolicyId};
use domain_policy::{CoverageType, NewPolicy, Policy, PolicyStatus, PolicyUpdate};

use super::{check_non_negative, check_percentage, invalid};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_registration"))]
pub struct RegisterPolicyRequest {
    #[validate(length(min = 1, message = "patientKey is required"))]
    pub patient_key: String,
    pub patient_name: Option<String>,
    #[validate(length(min = 1, message = "insurerName is required"))]
    pub insurer_name: String,
    #[validate(length(min = 1, message = "policyNumber is required"))]
    pub policy_number: String,
    pub coverage_type: Option<CoverageType>,
    pub coverage_percentage: Option<Decimal>,
    pub max_annual_amount: Option<Decimal>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn validate_registration(request: &RegisterPolicyRequest) -> Result<(), ValidationError> {
    if let Some(pct) = request.coverage_percentage {
        check_percentage(pct)?;
    }
    if let Some(max) = request.max_annual_amount {
        check_non_negative(max, "maxAnnualAmount")?;
    }
    if request.start_date > request.end_date {
        return Err(invalid("validity_order", "startDate must not be after endDate"));
    }
    Ok(())
}

impl From<RegisterPolicyRequest> for NewPolicy {
    fn from(request: RegisterPolicyRequest) -> Self {
        NewPolicy {
            patient_key: request.patient_key,
            patient_name: request.patient_name,
            insurer_name: request.insurer_name,
            policy_number: request.policy_number,
            coverage_type: request.coverage_type,
            coverage_percentage: request.coverage_percentage,
            max_annual_amount: request.max_annual_amount,
            start_date: Some(request.start_date),
            end_date: Some(request.end_date),
        }
    }
}

/// Partial update; at least one field must be present
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_update"))]
pub struct UpdatePolicyRequest {
    pub status: Option<PolicyStatus>,
    pub used_amount: Option<Decimal>,
    pub coverage_percentage: Option<Decimal>,
    pub max_annual_amount: Option<Decimal>,
    pub end_date: Option<NaiveDate>,
}

fn validate_update(request: &UpdatePolicyRequest) -> Result<(), ValidationError> {
    if let Some(used) = request.used_amount {
        check_non_negative(used, "usedAmount")?;
    }
    if let Some(max) = request.max_annual_amount {
        check_non_negative(max, "maxAnnualAmount")?;
    }
    if let Some(pct) = request.coverage_percentage {
        check_percentage(pct)?;
    }
    Ok(())
}

impl From<UpdatePolicyRequest> for PolicyUpdate {
    fn from(request: UpdatePolicyRequest) -> Self {
        PolicyUpdate {
            status: request.status,
            used_amount: request.used_amount,
            coverage_percentage: request.coverage_percentage,
            max_annual_amount: request.max_annual_amount,
            end_date: request.end_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResponse {
    pub id: PolicyId,
    pub patient_key: String,
    pub patient_name: String,
    pub insurer_name: String,
    pub policy_number: String,
    pub coverage_type: CoverageType,
    pub coverage_percentage: Percentage,
    pub max_annual_amount: Money,
    pub used_amount: Money,
    pub remaining_budget: Money,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Stored status
    pub status: PolicyStatus,
    /// Status as of today, `expired` once outside the validity window
    pub effective_status: PolicyStatus,
    pub created_at: DateTime<Utc>,
}

impl PolicyResponse {
    pub fn new(policy: Policy, today: NaiveDate) -> Self {
        Self {
            id: policy.id,
            remaining_budget: policy.remaining_budget(),
            effective_status: policy.effective_status(today),
            start_date: policy.validity.start_date(),
            end_date: policy.validity.end_date(),
            patient_key: policy.patient_key,
            patient_name: policy.patient_name,
            insurer_name: policy.insurer_name,
            policy_number: policy.policy_number,
            coverage_type: policy.coverage_type,
            coverage_percentage: policy.coverage_percentage,
            max_annual_amount: policy.max_annual_amount,
            used_amount: policy.used_amount,
            status: policy.status,
            created_at: policy.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn registration() -> serde_json::Value {
        json!({
            "patientKey": "12345678",
            "patientName": "Ahmed Tounsi",
            "insurerName": "CNAM Tunisie",
            "policyNumber": "CNAM-2024-001234",
            "coverageType": "complete",
            "coveragePercentage": "70",
            "maxAnnualAmount": "3000",
            "startDate": "2024-01-01",
            "endDate": "2024-12-31"
        })
    }

    #[test]
    fn test_registration_deserializes_camel_case() {
        let request: RegisterPolicyRequest = serde_json::from_value(registration()).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.coverage_type, Some(CoverageType::Complete));

        let new_policy = NewPolicy::from(request);
        assert_eq!(new_policy.coverage_percentage, Some(dec!(70)));
    }

    #[test]
    fn test_registration_rejects_blank_policy_number() {
        let mut body = registration();
        body["policyNumber"] = json!("");
        let request: RegisterPolicyRequest = serde_json::from_value(body).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_registration_rejects_out_of_range_percentage() {
        let mut body = registration();
        body["coveragePercentage"] = json!("120");
        let request: RegisterPolicyRequest = serde_json::from_value(body).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_registration_rejects_inverted_dates() {
        let mut body = registration();
        body["endDate"] = json!("2023-12-31");
        let request: RegisterPolicyRequest = serde_json::from_value(body).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_rejects_negative_used_amount() {
        let request = UpdatePolicyRequest {
            used_amount: Some(dec!(-5)),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_unknown_status_fails_to_deserialize() {
        let result: Result<UpdatePolicyRequest, _> = serde_json::from_value(json!({"status": "lapsed"}));
        assert!(result.is_err());
    }
}

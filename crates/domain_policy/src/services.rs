//! Policy domain services
//!
//! `PolicyService` fronts the Policy Store port with input validation and
//! logging. `CoverageVerifier` loads a patient's policies and runs the pure
//! calculator against the engine's calendar day.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use core_kernel::{Money, PolicyId, Timezone};

use crate::coverage::{self, CoverageVerification};
use crate::error::PolicyError;
use crate::policy::{mask_patient_key, NewPolicy, Policy, PolicyQuery, PolicyStatus, PolicyUpdate};
use crate::ports::PolicyPort;

/// Message attached to verifications that found no usable policy
pub const NO_COVERAGE_MESSAGE: &str = "No active insurance coverage found";

/// Service for registering and administering policies
#[derive(Clone)]
pub struct PolicyService {
    port: Arc<dyn PolicyPort>,
}

impl PolicyService {
    pub fn new(port: Arc<dyn PolicyPort>) -> Self {
        Self { port }
    }

    /// Registers a new policy
    ///
    /// # Errors
    ///
    /// `MissingRequiredField`/`Validation` for bad input,
    /// `DuplicatePolicyNumber` if the number is taken.
    #[instrument(skip(self, new_policy), fields(policy_number = %new_policy.policy_number))]
    pub async fn create_policy(&self, new_policy: NewPolicy) -> Result<Policy, PolicyError> {
        let policy_number = new_policy.policy_number.clone();
        let policy = Policy::register(new_policy, Utc::now()).map_err(|e| {
            warn!(error = %e, kind = %e.kind(), "policy registration rejected");
            e
        })?;

        let created = self.port.create_policy(policy).await.map_err(|e| {
            let error = if e.is_conflict() {
                PolicyError::DuplicatePolicyNumber(policy_number)
            } else {
                PolicyError::from_port(e)
            };
            warn!(error = %error, kind = %error.kind(), "policy registration failed");
            error
        })?;

        info!(
            policy_id = %created.id,
            patient = %mask_patient_key(&created.patient_key),
            coverage_percentage = %created.coverage_percentage,
            max_annual_amount = %created.max_annual_amount,
            "policy registered"
        );
        Ok(created)
    }

    pub async fn get_policy(&self, id: PolicyId) -> Result<Policy, PolicyError> {
        self.port.get_policy(id).await.map_err(PolicyError::from_port)
    }

    /// Lists policies matching the optional patient and status filters
    pub async fn list_policies(&self, query: PolicyQuery) -> Result<Vec<Policy>, PolicyError> {
        self.port.find_policies(query).await.map_err(PolicyError::from_port)
    }

    /// Lists one patient's policies
    pub async fn list_by_patient(
        &self,
        patient_key: &str,
        status: Option<PolicyStatus>,
    ) -> Result<Vec<Policy>, PolicyError> {
        let query = PolicyQuery {
            patient_key: Some(patient_key.to_string()),
            status,
        };
        self.list_policies(query).await
    }

    /// Applies an administrative update
    ///
    /// # Errors
    ///
    /// `NoFieldsToUpdate` for an empty update, `NotFound` if absent,
    /// `BudgetExceeded`/`Validation` if the result would break an invariant.
    #[instrument(skip(self, update), fields(policy_id = %id))]
    pub async fn update_policy(&self, id: PolicyId, update: PolicyUpdate) -> Result<Policy, PolicyError> {
        if update.is_empty() {
            return Err(PolicyError::NoFieldsToUpdate);
        }

        let updated = self.port.update_policy(id, update).await.map_err(|e| {
            let error = PolicyError::from_port(e);
            warn!(error = %error, kind = %error.kind(), "policy update rejected");
            error
        })?;

        info!(
            status = %updated.status,
            used_amount = %updated.used_amount,
            max_annual_amount = %updated.max_annual_amount,
            "policy updated"
        );
        Ok(updated)
    }

    #[instrument(skip(self), fields(policy_id = %id))]
    pub async fn delete_policy(&self, id: PolicyId) -> Result<(), PolicyError> {
        self.port.delete_policy(id).await.map_err(|e| {
            let error = if e.is_conflict() {
                PolicyError::HasClaims(id.to_string())
            } else {
                PolicyError::from_port(e)
            };
            warn!(error = %error, kind = %error.kind(), "policy deletion rejected");
            error
        })?;

        info!("policy deleted");
        Ok(())
    }
}

/// Read-only coverage estimation across a patient's policies
#[derive(Clone)]
pub struct CoverageVerifier {
    port: Arc<dyn PolicyPort>,
    timezone: Timezone,
}

/// Verification result with the patient echoed back
#[derive(Debug, Clone, PartialEq)]
pub struct PatientCoverage {
    pub patient_key: String,
    pub verification: CoverageVerification,
    pub message: Option<String>,
}

impl CoverageVerifier {
    pub fn new(port: Arc<dyn PolicyPort>, timezone: Timezone) -> Self {
        Self { port, timezone }
    }

    /// Estimates how much of `requested_amount` the patient's policies cover
    ///
    /// Nothing is reserved; concurrent verifications against the same
    /// policy may each count its full remaining budget.
    #[instrument(skip(self, patient_key), fields(patient = %mask_patient_key(patient_key)))]
    pub async fn verify(&self, patient_key: &str, requested_amount: Decimal) -> Result<PatientCoverage, PolicyError> {
        if patient_key.trim().is_empty() {
            return Err(PolicyError::MissingRequiredField("patient_key".to_string()));
        }
        let requested_amount = Money::non_negative(requested_amount)?;

        let policies = self
            .port
            .find_policies(PolicyQuery::by_patient(patient_key))
            .await
            .map_err(PolicyError::from_port)?;
        debug!(candidates = policies.len(), "loaded patient policies");

        let verification = coverage::verify(requested_amount, &policies, self.timezone.today());
        let message = if verification.covered {
            None
        } else {
            Some(NO_COVERAGE_MESSAGE.to_string())
        };

        info!(
            covered = verification.covered,
            requested_amount = %verification.requested_amount,
            insurance_share = %verification.insurance_share,
            patient_share = %verification.patient_share,
            "coverage verified"
        );

        Ok(PatientCoverage {
            patient_key: patient_key.to_string(),
            verification,
            message,
        })
    }
}

//! Insurance engine facade
//!
//! Wires the policy and claims services to a storage backend and exposes
//! every operation in terms of the validated request and response DTOs.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use tracing::{info, instrument, warn};
use validator::Validate;

use core_kernel::{AdapterHealth, ClaimId, CoveragePeriod, HealthCheckResult, HealthCheckable, PolicyId};
use domain_claims::{AdjudicationSettings, ClaimQuery, ClaimStatus, ClaimsAdjudicator, ClaimsPort, InMemoryStore};
use domain_policy::{
    CoverageType, CoverageVerifier, NewPolicy, PolicyPort, PolicyQuery, PolicyService, PolicyStatus, PolicyUpdate,
};
use infra_db::{create_pool, run_migrations, PostgresClaimsAdapter, PostgresPolicyAdapter};

use crate::config::{EngineConfig, StorageBackend};
use crate::dto::{
    ClaimProcessingResponse, ClaimResponse, ClaimSubmissionResponse, CoverageVerificationResponse, PolicyResponse,
    ProcessClaimRequest, RegisterPolicyRequest, ReimbursementRequest, ReimbursementResponse, SubmitClaimRequest,
    UpdatePolicyRequest, VerifyCoverageRequest,
};
use crate::error::EngineError;

/// Patient the demo contracts are registered for
pub const DEMO_PATIENT_KEY: &str = "12345678";

/// Aggregated adapter health
#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineHealth {
    pub status: AdapterHealth,
    pub adapters: Vec<HealthCheckResult>,
}

#[derive(Clone)]
pub struct InsuranceEngine {
    policies: PolicyService,
    verifier: CoverageVerifier,
    adjudicator: ClaimsAdjudicator,
    health_checks: Vec<Arc<dyn HealthCheckable>>,
    backend: StorageBackend,
}

impl InsuranceEngine {
    /// Builds the engine on the configured storage backend
    ///
    /// For PostgreSQL this creates the pool and applies pending migrations.
    pub async fn connect(config: &EngineConfig) -> Result<Self, EngineError> {
        match config.storage {
            StorageBackend::Memory => Ok(Self::in_memory(config.adjudication.clone())),
            StorageBackend::Postgres => {
                let pool = create_pool(config.database.pool_config()).await?;
                run_migrations(&pool).await?;

                let policies = Arc::new(PostgresPolicyAdapter::new(pool.clone()));
                let claims = Arc::new(PostgresClaimsAdapter::new(pool));
                Ok(Self::from_ports(
                    policies.clone(),
                    claims.clone(),
                    vec![policies as Arc<dyn HealthCheckable>, claims as Arc<dyn HealthCheckable>],
                    StorageBackend::Postgres,
                    config.adjudication.clone(),
                ))
            }
        }
    }

    /// Engine over a fresh in-memory store
    pub fn in_memory(settings: AdjudicationSettings) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::from_ports(
            store.clone(),
            store.clone(),
            vec![store as Arc<dyn HealthCheckable>],
            StorageBackend::Memory,
            settings,
        )
    }

    pub fn from_ports(
        policy_port: Arc<dyn PolicyPort>,
        claims_port: Arc<dyn ClaimsPort>,
        health_checks: Vec<Arc<dyn HealthCheckable>>,
        backend: StorageBackend,
        settings: AdjudicationSettings,
    ) -> Self {
        info!(
            backend = %backend,
            budget_enforcement = ?settings.budget_enforcement,
            timezone = %settings.timezone,
            "insurance engine ready"
        );

        Self {
            policies: PolicyService::new(policy_port.clone()),
            verifier: CoverageVerifier::new(policy_port.clone(), settings.timezone),
            adjudicator: ClaimsAdjudicator::new(policy_port, claims_port, settings),
            health_checks,
            backend,
        }
    }

    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    pub fn settings(&self) -> &AdjudicationSettings {
        self.adjudicator.settings()
    }

    fn today(&self) -> NaiveDate {
        self.settings().timezone.today()
    }

    // Policy store

    pub async fn register_policy(&self, request: RegisterPolicyRequest) -> Result<PolicyResponse, EngineError> {
        request.validate()?;
        let policy = self.policies.create_policy(request.into()).await?;
        Ok(PolicyResponse::new(policy, self.today()))
    }

    pub async fn get_policy(&self, id: PolicyId) -> Result<PolicyResponse, EngineError> {
        let policy = self.policies.get_policy(id).await?;
        Ok(PolicyResponse::new(policy, self.today()))
    }

    /// Lists policies, newest first
    pub async fn list_policies(
        &self,
        patient_key: Option<&str>,
        status: Option<PolicyStatus>,
    ) -> Result<Vec<PolicyResponse>, EngineError> {
        let query = PolicyQuery {
            patient_key: patient_key.map(str::to_string),
            status,
        };
        let today = self.today();
        let policies = self.policies.list_policies(query).await?;
        Ok(policies.into_iter().map(|p| PolicyResponse::new(p, today)).collect())
    }

    pub async fn update_policy(
        &self,
        id: PolicyId,
        request: UpdatePolicyRequest,
    ) -> Result<PolicyResponse, EngineError> {
        request.validate()?;
        let policy = self.policies.update_policy(id, request.into()).await?;
        Ok(PolicyResponse::new(policy, self.today()))
    }

    /// Deletes a policy that has no claims
    pub async fn delete_policy(&self, id: PolicyId) -> Result<(), EngineError> {
        Ok(self.policies.delete_policy(id).await?)
    }

    // Coverage

    pub async fn verify_coverage(
        &self,
        request: VerifyCoverageRequest,
    ) -> Result<CoverageVerificationResponse, EngineError> {
        request.validate()?;
        let coverage = self.verifier.verify(&request.patient_key, request.amount).await?;
        Ok(coverage.into())
    }

    // Claims

    pub async fn submit_claim(&self, request: SubmitClaimRequest) -> Result<ClaimSubmissionResponse, EngineError> {
        request.validate()?;
        let receipt = self.adjudicator.submit_claim(request.into()).await?;
        Ok(receipt.into())
    }

    pub async fn process_claim(
        &self,
        claim_id: ClaimId,
        request: ProcessClaimRequest,
    ) -> Result<ClaimProcessingResponse, EngineError> {
        request.validate()?;
        let command = request.into_command()?;
        let outcome = self.adjudicator.process_claim(claim_id, command).await?;
        Ok(outcome.into())
    }

    pub async fn record_reimbursement(
        &self,
        claim_id: ClaimId,
        request: ReimbursementRequest,
    ) -> Result<ReimbursementResponse, EngineError> {
        request.validate()?;
        let reimbursement = self.adjudicator.record_reimbursement(claim_id, request.into()).await?;
        Ok(reimbursement.into())
    }

    pub async fn get_claim(&self, claim_id: ClaimId) -> Result<ClaimResponse, EngineError> {
        Ok(self.adjudicator.get_claim(claim_id).await?.into())
    }

    /// Lists claims joined with their policies, newest first
    pub async fn list_claims(
        &self,
        policy_id: Option<PolicyId>,
        status: Option<ClaimStatus>,
    ) -> Result<Vec<ClaimResponse>, EngineError> {
        let claims = self.adjudicator.list_claims(ClaimQuery { policy_id, status }).await?;
        Ok(claims.into_iter().map(Into::into).collect())
    }

    pub async fn get_reimbursement(&self, claim_id: ClaimId) -> Result<Option<ReimbursementResponse>, EngineError> {
        let reimbursement = self.adjudicator.get_reimbursement(claim_id).await?;
        Ok(reimbursement.map(Into::into))
    }

    // Operations

    /// Checks every adapter; the overall status is the worst one reported
    pub async fn health(&self) -> EngineHealth {
        let mut adapters = Vec::with_capacity(self.health_checks.len());
        for check in &self.health_checks {
            adapters.push(check.health_check().await);
        }

        let status = adapters
            .iter()
            .map(|r| r.status)
            .fold(AdapterHealth::Healthy, |worst, s| match (worst, s) {
                (AdapterHealth::Unhealthy, _) | (_, AdapterHealth::Unhealthy) => AdapterHealth::Unhealthy,
                (AdapterHealth::Degraded, _) | (_, AdapterHealth::Degraded) => AdapterHealth::Degraded,
                _ => AdapterHealth::Healthy,
            });
        if status != AdapterHealth::Healthy {
            warn!(status = ?status, "engine health degraded");
        }

        EngineHealth { status, adapters }
    }

    /// Registers the two demo contracts for [`DEMO_PATIENT_KEY`]
    ///
    /// Returns `false` without writing anything when the store already
    /// holds a policy.
    #[instrument(skip(self))]
    pub async fn seed_demo_data(&self) -> Result<bool, EngineError> {
        if !self.policies.list_policies(PolicyQuery::default()).await?.is_empty() {
            info!("policies present, skipping demo seed");
            return Ok(false);
        }

        let year = CoveragePeriod::calendar_year_of(self.today());
        let contracts = [
            (demo_policy("CNAM Tunisie", "CNAM-2024-001234", CoverageType::Complete, year), dec!(70), dec!(3000), dec!(450)),
            (
                demo_policy("Assurances STAR", "STAR-MED-2024-5678", CoverageType::Complementary, year),
                dec!(20),
                dec!(2000),
                dec!(120),
            ),
        ];

        for (new_policy, percentage, max_annual, used) in contracts {
            let policy = self
                .policies
                .create_policy(NewPolicy {
                    coverage_percentage: Some(percentage),
                    max_annual_amount: Some(max_annual),
                    ..new_policy
                })
                .await?;
            self.policies
                .update_policy(
                    policy.id,
                    PolicyUpdate {
                        used_amount: Some(used),
                        ..Default::default()
                    },
                )
                .await?;
        }

        info!(seeded_at = %Utc::now(), "demo contracts registered");
        Ok(true)
    }
}

fn demo_policy(insurer: &str, number: &str, coverage_type: CoverageType, validity: CoveragePeriod) -> NewPolicy {
    NewPolicy {
        patient_key: DEMO_PATIENT_KEY.to_string(),
        patient_name: Some("Ahmed Tounsi".to_string()),
        insurer_name: insurer.to_string(),
        policy_number: number.to_string(),
        coverage_type: Some(coverage_type),
        start_date: Some(validity.start_date()),
        end_date: Some(validity.end_date()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_engine_is_healthy() {
        let engine = InsuranceEngine::in_memory(AdjudicationSettings::default());
        let health = engine.health().await;

        assert_eq!(engine.backend(), StorageBackend::Memory);
        assert_eq!(health.status, AdapterHealth::Healthy);
        assert_eq!(health.adapters.len(), 1);
    }

    #[tokio::test]
    async fn test_seed_runs_once() {
        let engine = InsuranceEngine::in_memory(AdjudicationSettings::default());

        assert!(engine.seed_demo_data().await.unwrap());
        assert!(!engine.seed_demo_data().await.unwrap());

        let policies = engine.list_policies(Some(DEMO_PATIENT_KEY), None).await.unwrap();
        assert_eq!(policies.len(), 2);
        assert!(policies.iter().all(|p| p.effective_status == PolicyStatus::Active));
    }
}

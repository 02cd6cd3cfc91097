//! PostgreSQL Policy Adapter
//!
//! Implements `PolicyPort` over [`PolicyRepository`]. Rows are validated on
//! the way back into the domain, so a row that breaks a domain invariant
//! surfaces as `DatabaseError::CorruptRow` rather than a silently wrong
//! `Policy`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{CoveragePeriod, DomainPort, HealthCheckResult, HealthCheckable, Money, Percentage, PolicyId, PortError};
use domain_policy::{CoverageType, Policy, PolicyPort, PolicyQuery, PolicyStatus, PolicyUpdate};

use crate::error::DatabaseError;
use crate::repositories::policy::{
    CoverageType as DbCoverageType, PolicyRepository, PolicyRow, PolicyStatus as DbPolicyStatus,
};

const ADAPTER_ID: &str = "postgres-policy-adapter";

/// PostgreSQL-backed implementation of `PolicyPort`
#[derive(Debug, Clone)]
pub struct PostgresPolicyAdapter {
    repository: PolicyRepository,
    pool: PgPool,
}

impl PostgresPolicyAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: PolicyRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &PolicyRepository {
        &self.repository
    }
}

impl DomainPort for PostgresPolicyAdapter {}

#[async_trait]
impl HealthCheckable for PostgresPolicyAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, ADAPTER_ID).await
    }
}

#[async_trait]
impl PolicyPort for PostgresPolicyAdapter {
    #[instrument(skip(self, policy), fields(policy_id = %policy.id))]
    async fn create_policy(&self, policy: Policy) -> Result<Policy, PortError> {
        debug!("Inserting policy");

        let row = self.repository.insert(&policy_to_row(&policy)).await?;
        Ok(row_to_policy(row)?)
    }

    #[instrument(skip(self), fields(policy_id = %id))]
    async fn get_policy(&self, id: PolicyId) -> Result<Policy, PortError> {
        debug!("Fetching policy by ID");

        let row = self.repository.get_by_id(id.into()).await?;
        Ok(row_to_policy(row)?)
    }

    #[instrument(skip(self))]
    async fn find_policies(&self, query: PolicyQuery) -> Result<Vec<Policy>, PortError> {
        debug!("Finding policies");

        let rows = self
            .repository
            .find(query.patient_key.as_deref(), query.status.map(domain_to_db_status))
            .await?;

        rows.into_iter()
            .map(|row| row_to_policy(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self, update), fields(policy_id = %id))]
    async fn update_policy(&self, id: PolicyId, update: PolicyUpdate) -> Result<Policy, PortError> {
        debug!("Updating policy");

        let row = self
            .repository
            .update(id.into(), move |current| {
                let mut policy = row_to_policy(current)?;
                policy
                    .apply_update(&update)
                    .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
                Ok(policy_to_row(&policy))
            })
            .await?;

        Ok(row_to_policy(row)?)
    }

    #[instrument(skip(self), fields(policy_id = %id))]
    async fn delete_policy(&self, id: PolicyId) -> Result<(), PortError> {
        debug!("Deleting policy");

        self.repository.delete(id.into()).await?;
        Ok(())
    }
}

fn corrupt(row: &PolicyRow, error: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::CorruptRow(format!("policy {}: {}", row.policy_id, error))
}

pub(crate) fn row_to_policy(row: PolicyRow) -> Result<Policy, DatabaseError> {
    let coverage_percentage = Percentage::new(row.coverage_percentage).map_err(|e| corrupt(&row, e))?;
    let max_annual_amount = Money::non_negative(row.max_annual_amount).map_err(|e| corrupt(&row, e))?;
    let used_amount = Money::non_negative(row.used_amount).map_err(|e| corrupt(&row, e))?;
    let validity = CoveragePeriod::new(row.start_date, row.end_date).map_err(|e| corrupt(&row, e))?;

    Ok(Policy {
        id: PolicyId::from(row.policy_id),
        patient_key: row.patient_key,
        patient_name: row.patient_name,
        insurer_name: row.insurer_name,
        policy_number: row.policy_number,
        coverage_type: db_to_domain_coverage_type(row.coverage_type),
        coverage_percentage,
        max_annual_amount,
        used_amount,
        validity,
        status: db_to_domain_status(row.status),
        created_at: row.created_at,
    })
}

fn policy_to_row(policy: &Policy) -> PolicyRow {
    PolicyRow {
        policy_id: policy.id.into(),
        patient_key: policy.patient_key.clone(),
        patient_name: policy.patient_name.clone(),
        insurer_name: policy.insurer_name.clone(),
        policy_number: policy.policy_number.clone(),
        coverage_type: domain_to_db_coverage_type(policy.coverage_type),
        coverage_percentage: policy.coverage_percentage.value(),
        max_annual_amount: policy.max_annual_amount.amount(),
        used_amount: policy.used_amount.amount(),
        start_date: policy.validity.start_date(),
        end_date: policy.validity.end_date(),
        status: domain_to_db_status(policy.status),
        created_at: policy.created_at,
    }
}

fn db_to_domain_coverage_type(t: DbCoverageType) -> CoverageType {
    match t {
        DbCoverageType::Basic => CoverageType::Basic,
        DbCoverageType::Complementary => CoverageType::Complementary,
        DbCoverageType::Complete => CoverageType::Complete,
    }
}

fn domain_to_db_coverage_type(t: CoverageType) -> DbCoverageType {
    match t {
        CoverageType::Basic => DbCoverageType::Basic,
        CoverageType::Complementary => DbCoverageType::Complementary,
        CoverageType::Complete => DbCoverageType::Complete,
    }
}

fn db_to_domain_status(s: DbPolicyStatus) -> PolicyStatus {
    match s {
        DbPolicyStatus::Active => PolicyStatus::Active,
        DbPolicyStatus::Suspended => PolicyStatus::Suspended,
        DbPolicyStatus::Expired => PolicyStatus::Expired,
        DbPolicyStatus::Cancelled => PolicyStatus::Cancelled,
    }
}

fn domain_to_db_status(s: PolicyStatus) -> DbPolicyStatus {
    match s {
        PolicyStatus::Active => DbPolicyStatus::Active,
        PolicyStatus::Suspended => DbPolicyStatus::Suspended,
        PolicyStatus::Expired => DbPolicyStatus::Expired,
        PolicyStatus::Cancelled => DbPolicyStatus::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use domain_policy::NewPolicy;
    use rust_decimal_macros::dec;

    fn policy() -> Policy {
        Policy::register(
            NewPolicy {
                patient_key: "12345678".to_string(),
                patient_name: Some("Ahmed Tounsi".to_string()),
                insurer_name: "CNAM Tunisie".to_string(),
                policy_number: "CNAM-2024-001234".to_string(),
                coverage_type: Some(CoverageType::Complete),
                coverage_percentage: Some(dec!(70)),
                max_annual_amount: Some(dec!(3000)),
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                end_date: NaiveDate::from_ymd_opt(2024, 12, 31),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_policy_row_conversion_roundtrip() {
        let policy = policy();
        assert_eq!(row_to_policy(policy_to_row(&policy)).unwrap(), policy);
    }

    #[test]
    fn test_status_conversion_roundtrip() {
        for status in [
            PolicyStatus::Active,
            PolicyStatus::Suspended,
            PolicyStatus::Expired,
            PolicyStatus::Cancelled,
        ] {
            assert_eq!(db_to_domain_status(domain_to_db_status(status)), status);
        }
    }

    #[test]
    fn test_out_of_range_percentage_is_corrupt() {
        let mut row = policy_to_row(&policy());
        row.coverage_percentage = dec!(120);

        let err = row_to_policy(row).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow(_)));
    }

    #[test]
    fn test_inverted_validity_is_corrupt() {
        let mut row = policy_to_row(&policy());
        row.end_date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();

        assert!(matches!(row_to_policy(row), Err(DatabaseError::CorruptRow(_))));
    }
}

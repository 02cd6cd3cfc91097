//! Policy repository implementation
//!
//! Row-level access to the `policies` table. Updates run as
//! read-lock-modify-write inside one transaction so they serialize with
//! approval debits on the same row.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const POLICY_COLUMNS: &str = r#"
    policy_id,
    patient_key,
    patient_name,
    insurer_name,
    policy_number,
    coverage_type,
    coverage_percentage,
    max_annual_amount,
    used_amount,
    start_date,
    end_date,
    status,
    created_at
"#;

/// Repository for the policy store
///
/// ```rust,ignore
/// use infra_db::repositories::PolicyRepository;
///
/// let repo = PolicyRepository::new(pool);
/// let rows = repo.find(Some("12345678"), None).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PolicyRepository {
    pool: PgPool,
}

impl PolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new policy row
    ///
    /// A taken policy number surfaces as `DatabaseError::DuplicateEntry`.
    pub async fn insert(&self, row: &PolicyRow) -> Result<PolicyRow, DatabaseError> {
        let query = format!(
            r#"
            INSERT INTO policies ({POLICY_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {POLICY_COLUMNS}
            "#
        );
        let inserted = sqlx::query_as::<_, PolicyRow>(&query)
            .bind(row.policy_id)
            .bind(&row.patient_key)
            .bind(&row.patient_name)
            .bind(&row.insurer_name)
            .bind(&row.policy_number)
            .bind(row.coverage_type)
            .bind(row.coverage_percentage)
            .bind(row.max_annual_amount)
            .bind(row.used_amount)
            .bind(row.start_date)
            .bind(row.end_date)
            .bind(row.status)
            .bind(row.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(inserted)
    }

    /// Retrieves a policy by its identifier
    pub async fn get_by_id(&self, policy_id: Uuid) -> Result<PolicyRow, DatabaseError> {
        let query = format!("SELECT {POLICY_COLUMNS} FROM policies WHERE policy_id = $1");
        sqlx::query_as::<_, PolicyRow>(&query)
            .bind(policy_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Policy", policy_id))
    }

    /// Lists policies, optionally filtered by patient and status, newest first
    pub async fn find(
        &self,
        patient_key: Option<&str>,
        status: Option<PolicyStatus>,
    ) -> Result<Vec<PolicyRow>, DatabaseError> {
        let query = format!(
            r#"
            SELECT {POLICY_COLUMNS}
            FROM policies
            WHERE ($1::text IS NULL OR patient_key = $1)
              AND ($2::policy_status IS NULL OR status = $2)
            ORDER BY created_at DESC, policy_id DESC
            "#
        );
        let rows = sqlx::query_as::<_, PolicyRow>(&query)
            .bind(patient_key)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Locks a policy row, applies `change` and writes the result back
    ///
    /// The closure sees the committed row under `FOR UPDATE`; returning an
    /// error rolls the transaction back.
    pub async fn update<F>(&self, policy_id: Uuid, change: F) -> Result<PolicyRow, DatabaseError>
    where
        F: FnOnce(PolicyRow) -> Result<PolicyRow, DatabaseError> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT {POLICY_COLUMNS} FROM policies WHERE policy_id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, PolicyRow>(&select)
            .bind(policy_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Policy", policy_id))?;

        let changed = change(current)?;

        let update = format!(
            r#"
            UPDATE policies
            SET status = $2,
                used_amount = $3,
                coverage_percentage = $4,
                max_annual_amount = $5,
                end_date = $6
            WHERE policy_id = $1
            RETURNING {POLICY_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PolicyRow>(&update)
            .bind(policy_id)
            .bind(changed.status)
            .bind(changed.used_amount)
            .bind(changed.coverage_percentage)
            .bind(changed.max_annual_amount)
            .bind(changed.end_date)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Deletes a policy
    ///
    /// Claims referencing the policy surface as
    /// `DatabaseError::ForeignKeyViolation`.
    pub async fn delete(&self, policy_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM policies WHERE policy_id = $1")
            .bind(policy_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Policy", policy_id));
        }
        Ok(())
    }
}

/// Contract kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "coverage_type", rename_all = "snake_case")]
pub enum CoverageType {
    Basic,
    Complementary,
    Complete,
}

/// Administrative policy status
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "policy_status", rename_all = "snake_case")]
pub enum PolicyStatus {
    Active,
    Suspended,
    Expired,
    Cancelled,
}

/// Database row representation of a policy
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PolicyRow {
    pub policy_id: Uuid,
    pub patient_key: String,
    pub patient_name: String,
    pub insurer_name: String,
    pub policy_number: String,
    pub coverage_type: CoverageType,
    pub coverage_percentage: Decimal,
    pub max_annual_amount: Decimal,
    pub used_amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PolicyStatus,
    pub created_at: DateTime<Utc>,
}

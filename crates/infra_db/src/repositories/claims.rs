//! Claims repository implementation
//!
//! Database access for the claim ledger and reimbursement record. The
//! approval path changes the claim status and the owning policy's
//! `used_amount` in a single transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = r#"
    c.claim_id,
    c.policy_id,
    c.invoice_reference,
    c.total_amount,
    c.covered_amount,
    c.patient_share,
    c.line_items,
    c.status,
    c.submitted_at,
    c.processed_at,
    c.rejection_reason
"#;

const REIMBURSEMENT_COLUMNS: &str = r#"
    reimbursement_id,
    claim_id,
    amount,
    payment_method,
    bank_account,
    processed_at,
    status
"#;

/// Repository for the claim ledger
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a submitted claim
    ///
    /// A claim for an unknown policy surfaces as
    /// `DatabaseError::ForeignKeyViolation`.
    pub async fn insert(&self, row: &ClaimRow) -> Result<ClaimRow, DatabaseError> {
        let query = format!(
            r#"
            INSERT INTO claims AS c (
                claim_id, policy_id, invoice_reference, total_amount, covered_amount,
                patient_share, line_items, status, submitted_at, processed_at, rejection_reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {CLAIM_COLUMNS}
            "#
        );
        let inserted = sqlx::query_as::<_, ClaimRow>(&query)
            .bind(row.claim_id)
            .bind(row.policy_id)
            .bind(&row.invoice_reference)
            .bind(row.total_amount)
            .bind(row.covered_amount)
            .bind(row.patient_share)
            .bind(&row.line_items)
            .bind(row.status)
            .bind(row.submitted_at)
            .bind(row.processed_at)
            .bind(&row.rejection_reason)
            .fetch_one(&self.pool)
            .await?;

        Ok(inserted)
    }

    /// Retrieves a claim joined with its policy's display fields
    pub async fn get_with_policy(&self, claim_id: Uuid) -> Result<ClaimWithPolicyRow, DatabaseError> {
        let query = format!(
            r#"
            SELECT {CLAIM_COLUMNS}, p.patient_key, p.insurer_name, p.policy_number
            FROM claims c
            JOIN policies p ON p.policy_id = c.policy_id
            WHERE c.claim_id = $1
            "#
        );
        sqlx::query_as::<_, ClaimWithPolicyRow>(&query)
            .bind(claim_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))
    }

    /// Lists claims, optionally filtered by policy and status, newest first
    pub async fn find(
        &self,
        policy_id: Option<Uuid>,
        status: Option<ClaimStatus>,
    ) -> Result<Vec<ClaimWithPolicyRow>, DatabaseError> {
        let query = format!(
            r#"
            SELECT {CLAIM_COLUMNS}, p.patient_key, p.insurer_name, p.policy_number
            FROM claims c
            JOIN policies p ON p.policy_id = c.policy_id
            WHERE ($1::uuid IS NULL OR c.policy_id = $1)
              AND ($2::claim_status IS NULL OR c.status = $2)
            ORDER BY c.submitted_at DESC, c.claim_id DESC
            "#
        );
        let rows = sqlx::query_as::<_, ClaimWithPolicyRow>(&query)
            .bind(policy_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Approves a pending claim and debits its covered amount
    ///
    /// With `enforce_cap` set, the debit is refused when it would take
    /// `used_amount` past `max_annual_amount`; the transaction then rolls
    /// back and the claim stays pending.
    pub async fn approve(
        &self,
        claim_id: Uuid,
        processed_at: DateTime<Utc>,
        enforce_cap: bool,
    ) -> Result<StatusChange, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let update = format!(
            r#"
            UPDATE claims AS c
            SET status = 'approved', processed_at = $2
            WHERE c.claim_id = $1 AND c.status = 'pending'
            RETURNING {CLAIM_COLUMNS}
            "#
        );
        let claim = sqlx::query_as::<_, ClaimRow>(&update)
            .bind(claim_id)
            .bind(processed_at)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(claim) = claim else {
            let status = current_status(&mut tx, claim_id).await?;
            return Ok(StatusChange::NotPending(status));
        };

        let debited = sqlx::query(
            r#"
            UPDATE policies
            SET used_amount = used_amount + $1
            WHERE policy_id = $2
              AND (NOT $3 OR used_amount + $1 <= max_annual_amount)
            "#,
        )
        .bind(claim.covered_amount)
        .bind(claim.policy_id)
        .bind(enforce_cap)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(StatusChange::BudgetExceeded);
        }

        tx.commit().await?;
        Ok(StatusChange::Applied(claim))
    }

    /// Rejects a pending claim
    pub async fn reject(
        &self,
        claim_id: Uuid,
        reason: Option<&str>,
        processed_at: DateTime<Utc>,
    ) -> Result<StatusChange, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let update = format!(
            r#"
            UPDATE claims AS c
            SET status = 'rejected', processed_at = $2, rejection_reason = $3
            WHERE c.claim_id = $1 AND c.status = 'pending'
            RETURNING {CLAIM_COLUMNS}
            "#
        );
        let claim = sqlx::query_as::<_, ClaimRow>(&update)
            .bind(claim_id)
            .bind(processed_at)
            .bind(reason)
            .fetch_optional(&mut *tx)
            .await?;

        let change = match claim {
            Some(claim) => StatusChange::Applied(claim),
            None => StatusChange::NotPending(current_status(&mut tx, claim_id).await?),
        };

        tx.commit().await?;
        Ok(change)
    }

    /// Records the payout for an approved claim
    ///
    /// The claim row is share-locked so its status cannot change between
    /// the check and the insert.
    pub async fn insert_reimbursement(&self, row: &ReimbursementRow) -> Result<PayoutInsert, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let status = sqlx::query_scalar::<_, ClaimStatus>("SELECT status FROM claims WHERE claim_id = $1 FOR SHARE")
            .bind(row.claim_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", row.claim_id))?;

        if status != ClaimStatus::Approved {
            tx.rollback().await?;
            return Ok(PayoutInsert::ClaimNotApproved(status));
        }

        let insert = format!(
            r#"
            INSERT INTO reimbursements ({REIMBURSEMENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (claim_id) DO NOTHING
            RETURNING {REIMBURSEMENT_COLUMNS}
            "#
        );
        let inserted = sqlx::query_as::<_, ReimbursementRow>(&insert)
            .bind(row.reimbursement_id)
            .bind(row.claim_id)
            .bind(row.amount)
            .bind(row.payment_method)
            .bind(&row.bank_account)
            .bind(row.processed_at)
            .bind(row.status)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(match inserted {
            Some(row) => PayoutInsert::Recorded(row),
            None => PayoutInsert::Duplicate,
        })
    }

    /// Returns the reimbursement recorded for a claim, if any
    pub async fn find_reimbursement(&self, claim_id: Uuid) -> Result<Option<ReimbursementRow>, DatabaseError> {
        let query = format!("SELECT {REIMBURSEMENT_COLUMNS} FROM reimbursements WHERE claim_id = $1");
        let row = sqlx::query_as::<_, ReimbursementRow>(&query)
            .bind(claim_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

async fn current_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    claim_id: Uuid,
) -> Result<ClaimStatus, DatabaseError> {
    sqlx::query_scalar::<_, ClaimStatus>("SELECT status FROM claims WHERE claim_id = $1")
        .bind(claim_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))
}

/// Result of a guarded status update
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    Applied(ClaimRow),
    NotPending(ClaimStatus),
    BudgetExceeded,
}

/// Result of a reimbursement insert
#[derive(Debug, Clone, PartialEq)]
pub enum PayoutInsert {
    Recorded(ReimbursementRow),
    ClaimNotApproved(ClaimStatus),
    Duplicate,
}

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "claim_status", rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Check,
    Cash,
    DirectDeposit,
}

/// Reimbursement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "reimbursement_status", rename_all = "snake_case")]
pub enum ReimbursementStatus {
    Completed,
}

/// Database row representation of a claim
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub policy_id: Uuid,
    pub invoice_reference: String,
    pub total_amount: Decimal,
    pub covered_amount: Decimal,
    pub patient_share: Decimal,
    pub line_items: Json<Vec<Value>>,
    pub status: ClaimStatus,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

/// Claim row joined with its policy
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ClaimWithPolicyRow {
    #[sqlx(flatten)]
    pub claim: ClaimRow,
    pub patient_key: String,
    pub insurer_name: String,
    pub policy_number: String,
}

/// Database row representation of a reimbursement
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ReimbursementRow {
    pub reimbursement_id: Uuid,
    pub claim_id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub bank_account: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub status: ReimbursementStatus,
}

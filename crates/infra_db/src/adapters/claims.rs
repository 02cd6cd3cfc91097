//! PostgreSQL Claims Adapter
//!
//! Implements `ClaimsPort` over [`ClaimsRepository`]. Approval, rejection
//! and payout each run as one database transaction inside the repository;
//! this adapter only maps rows and outcomes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use core_kernel::{ClaimId, DomainPort, HealthCheckResult, HealthCheckable, Money, PolicyId, PortError, ReimbursementId};
use domain_claims::{
    Claim, ClaimQuery, ClaimStatus, ClaimWithPolicy, ClaimsPort, PaymentMethod, Reimbursement, ReimbursementCommit,
    ReimbursementStatus, Transition,
};
use domain_policy::BudgetEnforcement;

use crate::error::DatabaseError;
use crate::repositories::claims::{
    ClaimRow, ClaimStatus as DbClaimStatus, ClaimWithPolicyRow, ClaimsRepository, PaymentMethod as DbPaymentMethod,
    PayoutInsert, ReimbursementRow, ReimbursementStatus as DbReimbursementStatus, StatusChange,
};

const ADAPTER_ID: &str = "postgres-claims-adapter";

/// PostgreSQL-backed implementation of `ClaimsPort`
#[derive(Debug, Clone)]
pub struct PostgresClaimsAdapter {
    repository: ClaimsRepository,
    pool: PgPool,
}

impl PostgresClaimsAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClaimsRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &ClaimsRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClaimsAdapter {}

#[async_trait]
impl HealthCheckable for PostgresClaimsAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, ADAPTER_ID).await
    }
}

#[async_trait]
impl ClaimsPort for PostgresClaimsAdapter {
    #[instrument(skip(self, claim), fields(claim_id = %claim.id, policy_id = %claim.policy_id))]
    async fn insert_claim(&self, claim: Claim) -> Result<Claim, PortError> {
        debug!("Inserting claim");

        match self.repository.insert(&claim_to_row(&claim)).await {
            Ok(row) => Ok(row_to_claim(row)?),
            Err(DatabaseError::ForeignKeyViolation(_)) => Err(PortError::not_found("Policy", claim.policy_id)),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get_claim(&self, id: ClaimId) -> Result<ClaimWithPolicy, PortError> {
        debug!("Fetching claim by ID");

        let row = self.repository.get_with_policy(id.into()).await?;
        Ok(row_to_claim_with_policy(row)?)
    }

    #[instrument(skip(self))]
    async fn find_claims(&self, query: ClaimQuery) -> Result<Vec<ClaimWithPolicy>, PortError> {
        debug!("Finding claims");

        let rows = self
            .repository
            .find(query.policy_id.map(Into::into), query.status.map(domain_to_db_claim_status))
            .await?;

        rows.into_iter()
            .map(|row| row_to_claim_with_policy(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn commit_approval(
        &self,
        id: ClaimId,
        processed_at: DateTime<Utc>,
        enforcement: BudgetEnforcement,
    ) -> Result<Transition, PortError> {
        let enforce_cap = enforcement == BudgetEnforcement::Strict;
        let change = self.repository.approve(id.into(), processed_at, enforce_cap).await?;
        if matches!(change, StatusChange::BudgetExceeded) {
            warn!("approval refused by annual cap");
        }
        Ok(status_change_to_transition(change)?)
    }

    #[instrument(skip(self, reason), fields(claim_id = %id))]
    async fn commit_rejection(
        &self,
        id: ClaimId,
        reason: Option<String>,
        processed_at: DateTime<Utc>,
    ) -> Result<Transition, PortError> {
        let change = self
            .repository
            .reject(id.into(), reason.as_deref(), processed_at)
            .await?;
        Ok(status_change_to_transition(change)?)
    }

    #[instrument(skip(self, reimbursement), fields(claim_id = %reimbursement.claim_id))]
    async fn record_reimbursement(&self, reimbursement: Reimbursement) -> Result<ReimbursementCommit, PortError> {
        debug!("Recording reimbursement");

        let outcome = self
            .repository
            .insert_reimbursement(&reimbursement_to_row(&reimbursement))
            .await?;

        Ok(match outcome {
            PayoutInsert::Recorded(row) => ReimbursementCommit::Recorded(row_to_reimbursement(row)?),
            PayoutInsert::ClaimNotApproved(status) => {
                ReimbursementCommit::ClaimNotApproved(db_to_domain_claim_status(status))
            }
            PayoutInsert::Duplicate => ReimbursementCommit::Duplicate,
        })
    }

    #[instrument(skip(self), fields(claim_id = %claim_id))]
    async fn find_reimbursement(&self, claim_id: ClaimId) -> Result<Option<Reimbursement>, PortError> {
        let row = self.repository.find_reimbursement(claim_id.into()).await?;
        Ok(row.map(row_to_reimbursement).transpose()?)
    }
}

fn status_change_to_transition(change: StatusChange) -> Result<Transition, DatabaseError> {
    Ok(match change {
        StatusChange::Applied(row) => Transition::Applied(row_to_claim(row)?),
        StatusChange::NotPending(status) => Transition::NotPending(db_to_domain_claim_status(status)),
        StatusChange::BudgetExceeded => Transition::BudgetExceeded,
    })
}

fn money(value: rust_decimal::Decimal, what: &str, id: uuid::Uuid) -> Result<Money, DatabaseError> {
    Money::non_negative(value).map_err(|e| DatabaseError::CorruptRow(format!("{} of {}: {}", what, id, e)))
}

fn row_to_claim(row: ClaimRow) -> Result<Claim, DatabaseError> {
    Ok(Claim {
        id: ClaimId::from(row.claim_id),
        policy_id: PolicyId::from(row.policy_id),
        invoice_reference: row.invoice_reference,
        total_amount: money(row.total_amount, "total_amount", row.claim_id)?,
        covered_amount: money(row.covered_amount, "covered_amount", row.claim_id)?,
        patient_share: money(row.patient_share, "patient_share", row.claim_id)?,
        line_items: row.line_items.0,
        status: db_to_domain_claim_status(row.status),
        submitted_at: row.submitted_at,
        processed_at: row.processed_at,
        rejection_reason: row.rejection_reason,
    })
}

fn claim_to_row(claim: &Claim) -> ClaimRow {
    ClaimRow {
        claim_id: claim.id.into(),
        policy_id: claim.policy_id.into(),
        invoice_reference: claim.invoice_reference.clone(),
        total_amount: claim.total_amount.amount(),
        covered_amount: claim.covered_amount.amount(),
        patient_share: claim.patient_share.amount(),
        line_items: Json(claim.line_items.clone()),
        status: domain_to_db_claim_status(claim.status),
        submitted_at: claim.submitted_at,
        processed_at: claim.processed_at,
        rejection_reason: claim.rejection_reason.clone(),
    }
}

fn row_to_claim_with_policy(row: ClaimWithPolicyRow) -> Result<ClaimWithPolicy, DatabaseError> {
    Ok(ClaimWithPolicy {
        claim: row_to_claim(row.claim)?,
        patient_key: row.patient_key,
        insurer_name: row.insurer_name,
        policy_number: row.policy_number,
    })
}

fn row_to_reimbursement(row: ReimbursementRow) -> Result<Reimbursement, DatabaseError> {
    Ok(Reimbursement {
        id: ReimbursementId::from(row.reimbursement_id),
        claim_id: ClaimId::from(row.claim_id),
        amount: money(row.amount, "amount", row.reimbursement_id)?,
        payment_method: db_to_domain_payment_method(row.payment_method),
        bank_account: row.bank_account,
        processed_at: row.processed_at,
        status: match row.status {
            DbReimbursementStatus::Completed => ReimbursementStatus::Completed,
        },
    })
}

fn reimbursement_to_row(reimbursement: &Reimbursement) -> ReimbursementRow {
    ReimbursementRow {
        reimbursement_id: reimbursement.id.into(),
        claim_id: reimbursement.claim_id.into(),
        amount: reimbursement.amount.amount(),
        payment_method: domain_to_db_payment_method(reimbursement.payment_method),
        bank_account: reimbursement.bank_account.clone(),
        processed_at: reimbursement.processed_at,
        status: match reimbursement.status {
            ReimbursementStatus::Completed => DbReimbursementStatus::Completed,
        },
    }
}

fn db_to_domain_claim_status(s: DbClaimStatus) -> ClaimStatus {
    match s {
        DbClaimStatus::Pending => ClaimStatus::Pending,
        DbClaimStatus::Approved => ClaimStatus::Approved,
        DbClaimStatus::Rejected => ClaimStatus::Rejected,
    }
}

fn domain_to_db_claim_status(s: ClaimStatus) -> DbClaimStatus {
    match s {
        ClaimStatus::Pending => DbClaimStatus::Pending,
        ClaimStatus::Approved => DbClaimStatus::Approved,
        ClaimStatus::Rejected => DbClaimStatus::Rejected,
    }
}

fn db_to_domain_payment_method(m: DbPaymentMethod) -> PaymentMethod {
    match m {
        DbPaymentMethod::BankTransfer => PaymentMethod::BankTransfer,
        DbPaymentMethod::Check => PaymentMethod::Check,
        DbPaymentMethod::Cash => PaymentMethod::Cash,
        DbPaymentMethod::DirectDeposit => PaymentMethod::DirectDeposit,
    }
}

fn domain_to_db_payment_method(m: PaymentMethod) -> DbPaymentMethod {
    match m {
        PaymentMethod::BankTransfer => DbPaymentMethod::BankTransfer,
        PaymentMethod::Check => DbPaymentMethod::Check,
        PaymentMethod::Cash => DbPaymentMethod::Cash,
        PaymentMethod::DirectDeposit => DbPaymentMethod::DirectDeposit,
    }
}

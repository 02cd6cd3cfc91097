//! Claim Ledger Port
//!
//! `ClaimsPort` stores claims and reimbursements and performs the two
//! commits that must be atomic:
//!
//! - **approval**: the claim's status write and the owning policy's
//!   `used_amount` increment land together or not at all
//! - **reimbursement**: the approved-claim check and the one-per-claim
//!   uniqueness check are made against the same committed state as the
//!   insert
//!
//! Expected domain refusals (claim no longer pending, budget exhausted,
//! duplicate payout) come back as `Ok` outcomes so the adjudicator can
//! classify them; `Err(PortError)` is reserved for missing rows and storage
//! failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{ClaimId, DomainPort, HealthCheckable, PortError};
use domain_policy::BudgetEnforcement;

use crate::claim::{Claim, ClaimQuery, ClaimStatus, ClaimWithPolicy};
use crate::reimbursement::Reimbursement;

/// Outcome of an approval or rejection commit
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The claim moved to its terminal status
    Applied(Claim),
    /// The claim had already left `Pending`
    NotPending(ClaimStatus),
    /// Strict enforcement refused the debit
    BudgetExceeded,
}

/// Outcome of a reimbursement commit
#[derive(Debug, Clone, PartialEq)]
pub enum ReimbursementCommit {
    Recorded(Reimbursement),
    ClaimNotApproved(ClaimStatus),
    Duplicate,
}

#[async_trait]
pub trait ClaimsPort: DomainPort + HealthCheckable {
    /// Stores a newly submitted claim
    ///
    /// Fails with `PortError::NotFound` if the owning policy is gone.
    async fn insert_claim(&self, claim: Claim) -> Result<Claim, PortError>;

    /// Retrieves a claim joined with its policy
    async fn get_claim(&self, id: ClaimId) -> Result<ClaimWithPolicy, PortError>;

    /// Lists claims matching the query, newest first
    async fn find_claims(&self, query: ClaimQuery) -> Result<Vec<ClaimWithPolicy>, PortError>;

    /// Approves a pending claim and debits its covered amount from the policy
    async fn commit_approval(
        &self,
        id: ClaimId,
        processed_at: DateTime<Utc>,
        enforcement: BudgetEnforcement,
    ) -> Result<Transition, PortError>;

    /// Rejects a pending claim; the policy is not touched
    async fn commit_rejection(
        &self,
        id: ClaimId,
        reason: Option<String>,
        processed_at: DateTime<Utc>,
    ) -> Result<Transition, PortError>;

    /// Records the payout for an approved claim
    async fn record_reimbursement(&self, reimbursement: Reimbursement) -> Result<ReimbursementCommit, PortError>;

    /// Returns the reimbursement recorded for a claim, if any
    async fn find_reimbursement(&self, claim_id: ClaimId) -> Result<Option<Reimbursement>, PortError>;
}

/// In-memory store implementing both the Policy Store and the Claim Ledger
///
/// A single lock guards all three tables, so every commit observes and
/// writes one consistent state.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::{HealthCheckResult, Money, PolicyId};
    use domain_policy::{Policy, PolicyPort, PolicyQuery, PolicyUpdate};

    #[derive(Debug, Default)]
    struct Tables {
        policies: HashMap<PolicyId, Policy>,
        claims: HashMap<ClaimId, Claim>,
        reimbursements: HashMap<ClaimId, Reimbursement>,
    }

    impl Tables {
        fn joined(&self, claim: &Claim) -> Result<ClaimWithPolicy, PortError> {
            let policy = self
                .policies
                .get(&claim.policy_id)
                .ok_or_else(|| PortError::not_found("Policy", claim.policy_id))?;
            Ok(ClaimWithPolicy::new(claim.clone(), policy))
        }
    }

    #[derive(Debug, Default, Clone)]
    pub struct InMemoryStore {
        tables: Arc<RwLock<Tables>>,
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates the store with policies
        pub async fn with_policies(policies: Vec<Policy>) -> Self {
            let store = Self::new();
            {
                let mut tables = store.tables.write().await;
                for policy in policies {
                    tables.policies.insert(policy.id, policy);
                }
            }
            store
        }

        /// Sum of covered amounts of approved claims for a policy
        pub async fn approved_total(&self, policy_id: PolicyId) -> Money {
            self.tables
                .read()
                .await
                .claims
                .values()
                .filter(|c| c.policy_id == policy_id && c.status == ClaimStatus::Approved)
                .map(|c| c.covered_amount)
                .sum()
        }
    }

    impl DomainPort for InMemoryStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                message: Some("in-memory store".to_string()),
                ..HealthCheckResult::healthy("memory")
            }
        }
    }

    #[async_trait]
    impl PolicyPort for InMemoryStore {
        async fn create_policy(&self, policy: Policy) -> Result<Policy, PortError> {
            let mut tables = self.tables.write().await;
            if tables.policies.values().any(|p| p.policy_number == policy.policy_number) {
                return Err(PortError::conflict(format!(
                    "policy number {} already exists",
                    policy.policy_number
                )));
            }
            tables.policies.insert(policy.id, policy.clone());
            Ok(policy)
        }

        async fn get_policy(&self, id: PolicyId) -> Result<Policy, PortError> {
            self.tables
                .read()
                .await
                .policies
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Policy", id))
        }

        async fn find_policies(&self, query: PolicyQuery) -> Result<Vec<Policy>, PortError> {
            let tables = self.tables.read().await;
            let mut results: Vec<Policy> = tables
                .policies
                .values()
                .filter(|p| query.matches(p))
                .cloned()
                .collect();
            results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(results)
        }

        async fn update_policy(&self, id: PolicyId, update: PolicyUpdate) -> Result<Policy, PortError> {
            let mut tables = self.tables.write().await;
            let policy = tables
                .policies
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Policy", id))?;
            let mut updated = policy.clone();
            updated
                .apply_update(&update)
                .map_err(|e| PortError::validation(e.to_string()))?;
            *policy = updated.clone();
            Ok(updated)
        }

        async fn delete_policy(&self, id: PolicyId) -> Result<(), PortError> {
            let mut tables = self.tables.write().await;
            if !tables.policies.contains_key(&id) {
                return Err(PortError::not_found("Policy", id));
            }
            if tables.claims.values().any(|c| c.policy_id == id) {
                return Err(PortError::conflict(format!("policy {} still has claims", id)));
            }
            tables.policies.remove(&id);
            Ok(())
        }
    }

    #[async_trait]
    impl ClaimsPort for InMemoryStore {
        async fn insert_claim(&self, claim: Claim) -> Result<Claim, PortError> {
            let mut tables = self.tables.write().await;
            if !tables.policies.contains_key(&claim.policy_id) {
                return Err(PortError::not_found("Policy", claim.policy_id));
            }
            tables.claims.insert(claim.id, claim.clone());
            Ok(claim)
        }

        async fn get_claim(&self, id: ClaimId) -> Result<ClaimWithPolicy, PortError> {
            let tables = self.tables.read().await;
            let claim = tables
                .claims
                .get(&id)
                .ok_or_else(|| PortError::not_found("Claim", id))?;
            tables.joined(claim)
        }

        async fn find_claims(&self, query: ClaimQuery) -> Result<Vec<ClaimWithPolicy>, PortError> {
            let tables = self.tables.read().await;
            let mut claims: Vec<&Claim> = tables.claims.values().filter(|c| query.matches(c)).collect();
            claims.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
            claims.into_iter().map(|c| tables.joined(c)).collect()
        }

        async fn commit_approval(
            &self,
            id: ClaimId,
            processed_at: DateTime<Utc>,
            enforcement: BudgetEnforcement,
        ) -> Result<Transition, PortError> {
            let mut guard = self.tables.write().await;
            let tables = &mut *guard;

            let claim = tables
                .claims
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Claim", id))?;
            if !claim.is_pending() {
                return Ok(Transition::NotPending(claim.status));
            }
            let policy = tables
                .policies
                .get_mut(&claim.policy_id)
                .ok_or_else(|| PortError::not_found("Policy", claim.policy_id))?;

            let mut debited = policy.clone();
            if debited.debit(claim.covered_amount, enforcement).is_err() {
                return Ok(Transition::BudgetExceeded);
            }
            let mut approved = claim.clone();
            approved
                .approve(processed_at)
                .map_err(|e| PortError::internal(e.to_string()))?;

            *policy = debited;
            *claim = approved.clone();
            Ok(Transition::Applied(approved))
        }

        async fn commit_rejection(
            &self,
            id: ClaimId,
            reason: Option<String>,
            processed_at: DateTime<Utc>,
        ) -> Result<Transition, PortError> {
            let mut tables = self.tables.write().await;
            let claim = tables
                .claims
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Claim", id))?;
            if !claim.is_pending() {
                return Ok(Transition::NotPending(claim.status));
            }
            claim
                .reject(reason, processed_at)
                .map_err(|e| PortError::internal(e.to_string()))?;
            Ok(Transition::Applied(claim.clone()))
        }

        async fn record_reimbursement(&self, reimbursement: Reimbursement) -> Result<ReimbursementCommit, PortError> {
            let mut tables = self.tables.write().await;
            let claim = tables
                .claims
                .get(&reimbursement.claim_id)
                .ok_or_else(|| PortError::not_found("Claim", reimbursement.claim_id))?;
            if claim.status != ClaimStatus::Approved {
                return Ok(ReimbursementCommit::ClaimNotApproved(claim.status));
            }
            if tables.reimbursements.contains_key(&reimbursement.claim_id) {
                return Ok(ReimbursementCommit::Duplicate);
            }
            tables
                .reimbursements
                .insert(reimbursement.claim_id, reimbursement.clone());
            Ok(ReimbursementCommit::Recorded(reimbursement))
        }

        async fn find_reimbursement(&self, claim_id: ClaimId) -> Result<Option<Reimbursement>, PortError> {
            Ok(self.tables.read().await.reimbursements.get(&claim_id).cloned())
        }
    }
}

//! Policy Store Port
//!
//! The `PolicyPort` trait is the Policy Store seen from the domain. Two
//! adapters implement it:
//!
//! - **PostgreSQL** (`infra_db::PostgresPolicyAdapter`)
//! - **In-memory** (`domain_claims::mock::InMemoryStore`, feature `mock`)
//!
//! Adapters receive policies that already passed domain validation. For
//! updates they must load, apply [`Policy::apply_update`] and write back as
//! one atomic step so a concurrent approval cannot interleave.
//!
//! ```rust,ignore
//! let port: Arc<dyn PolicyPort> = Arc::new(PostgresPolicyAdapter::new(pool));
//! let service = PolicyService::new(port);
//! let policy = service.create_policy(new_policy).await?;
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, HealthCheckable, PolicyId, PortError};

use crate::policy::{Policy, PolicyQuery, PolicyUpdate};

#[async_trait]
pub trait PolicyPort: DomainPort + HealthCheckable {
    /// Stores a newly registered policy
    ///
    /// Fails with `PortError::Conflict` if the policy number is taken.
    async fn create_policy(&self, policy: Policy) -> Result<Policy, PortError>;

    /// Retrieves a policy by ID
    async fn get_policy(&self, id: PolicyId) -> Result<Policy, PortError>;

    /// Lists policies matching the query, newest first
    async fn find_policies(&self, query: PolicyQuery) -> Result<Vec<Policy>, PortError>;

    /// Applies a partial update and returns the updated policy
    ///
    /// Fails with `PortError::NotFound` if absent and with
    /// `PortError::Validation` if the update breaks an invariant.
    async fn update_policy(&self, id: PolicyId, update: PolicyUpdate) -> Result<Policy, PortError>;

    /// Removes a policy
    ///
    /// Fails with `PortError::NotFound` if absent and with
    /// `PortError::Conflict` while claims reference it.
    async fn delete_policy(&self, id: PolicyId) -> Result<(), PortError>;

    /// Returns true if any policy is stored
    async fn has_policies(&self) -> Result<bool, PortError> {
        Ok(!self.find_policies(PolicyQuery::default()).await?.is_empty())
    }
}

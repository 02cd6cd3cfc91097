//! Strongly-typed identifiers for engine records
//!
//! Policies, claims and reimbursements are all keyed by UUIDs. Wrapping each
//! in its own newtype keeps a `ClaimId` from being passed where a `PolicyId`
//! is expected. The display form carries a short prefix (`POL-…`) which is
//! accepted back by `FromStr`, as is the bare UUID.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wraps an existing UUID, typically read back from storage
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Display prefix for this identifier type
            pub const fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new_v7()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.trim();
                let raw = raw.strip_prefix(concat!($prefix, "-")).unwrap_or(raw);
                Uuid::parse_str(raw).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifies an insurance contract in the policy store
    PolicyId,
    "POL"
);

define_id!(
    /// Identifies a claim in the claim ledger
    ClaimId,
    "CLM"
);

define_id!(
    /// Identifies a payout in the reimbursement record
    ReimbursementId,
    "RMB"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_id_display() {
        let id = PolicyId::new_v7();
        assert!(id.to_string().starts_with("POL-"));
    }

    #[test]
    fn test_id_parsing_with_prefix() {
        let original = ClaimId::new_v7();
        let parsed: ClaimId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_id_parsing_without_prefix() {
        let uuid = Uuid::new_v4();
        let parsed: ClaimId = uuid.to_string().parse().unwrap();
        assert_eq!(parsed.as_uuid(), &uuid);
    }

    #[test]
    fn test_foreign_prefix_is_rejected() {
        let claim = ClaimId::new_v7();
        assert!(claim.to_string().parse::<PolicyId>().is_err());
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let id = ReimbursementId::from(uuid);
        let back: Uuid = id.into();
        assert_eq!(uuid, back);
    }
}

//! Unit tests for the Policy aggregate
//!
//! Tests cover registration, implicit expiry, administrative updates and
//! budget debits.

use chrono::{NaiveDate, Utc};
use core_kernel::{ErrorKind, Money};
use domain_policy::{
    BudgetEnforcement, CoverageType, NewPolicy, Policy, PolicyError, PolicyQuery, PolicyStatus, PolicyUpdate,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn on(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Helper function to create a basic test policy
fn create_test_policy() -> Policy {
    Policy::register(
        NewPolicy {
            patient_key: "12345678".to_string(),
            patient_name: Some("Ahmed Tounsi".to_string()),
            insurer_name: "STAR Assurances".to_string(),
            policy_number: "STAR-MED-2024-5678".to_string(),
            coverage_type: Some(CoverageType::Complementary),
            coverage_percentage: Some(dec!(20)),
            max_annual_amount: Some(dec!(2000)),
            start_date: Some(on(2024, 1, 1)),
            end_date: Some(on(2024, 12, 31)),
        },
        Utc::now(),
    )
    .unwrap()
}

mod registration {
    use super::*;

    #[test]
    fn test_registered_policy_is_active_and_unused() {
        let policy = create_test_policy();
        assert_eq!(policy.status, PolicyStatus::Active);
        assert!(policy.used_amount.is_zero());
        assert_eq!(policy.remaining_budget(), Money::new(dec!(2000)));
    }

    #[test]
    fn test_missing_dates_rejected() {
        let result = Policy::register(
            NewPolicy {
                patient_key: "12345678".to_string(),
                insurer_name: "CNAM".to_string(),
                policy_number: "CNAM-1".to_string(),
                start_date: Some(on(2024, 1, 1)),
                ..Default::default()
            },
            Utc::now(),
        );
        let err = result.unwrap_err();
        assert!(matches!(err, PolicyError::MissingRequiredField(ref f) if f == "end_date"));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_negative_budget_rejected() {
        let result = Policy::register(
            NewPolicy {
                patient_key: "12345678".to_string(),
                insurer_name: "CNAM".to_string(),
                policy_number: "CNAM-1".to_string(),
                max_annual_amount: Some(dec!(-1)),
                start_date: Some(on(2024, 1, 1)),
                end_date: Some(on(2024, 12, 31)),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_budget_above_maximum_rejected() {
        let result = Policy::register(
            NewPolicy {
                patient_key: "12345678".to_string(),
                insurer_name: "CNAM".to_string(),
                policy_number: "CNAM-1".to_string(),
                max_annual_amount: Some("10000000000000000000000000000".parse::<Decimal>().unwrap()),
                start_date: Some(on(2024, 1, 1)),
                end_date: Some(on(2024, 12, 31)),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_percentage_beyond_two_decimals_rejected() {
        let result = Policy::register(
            NewPolicy {
                patient_key: "12345678".to_string(),
                insurer_name: "CNAM".to_string(),
                policy_number: "CNAM-1".to_string(),
                coverage_percentage: Some(dec!(33.333)),
                start_date: Some(on(2024, 1, 1)),
                end_date: Some(on(2024, 12, 31)),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_amounts_normalized_to_cents() {
        let policy = Policy::register(
            NewPolicy {
                patient_key: "12345678".to_string(),
                insurer_name: "CNAM".to_string(),
                policy_number: "CNAM-1".to_string(),
                max_annual_amount: Some(dec!(1999.999)),
                start_date: Some(on(2024, 1, 1)),
                end_date: Some(on(2024, 12, 31)),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(policy.max_annual_amount.to_string(), "2000.00");
    }
}

mod updates {
    use super::*;

    #[test]
    fn test_status_update() {
        let mut policy = create_test_policy();
        policy
            .apply_update(&PolicyUpdate { status: Some(PolicyStatus::Suspended), ..Default::default() })
            .unwrap();
        assert_eq!(policy.status, PolicyStatus::Suspended);
        assert!(!policy.is_usable_on(on(2024, 6, 1)));
    }

    #[test]
    fn test_coverage_percentage_update_validated() {
        let mut policy = create_test_policy();
        let err = policy
            .apply_update(&PolicyUpdate { coverage_percentage: Some(dec!(-1)), ..Default::default() })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(policy.coverage_percentage.value(), dec!(20));
    }

    #[test]
    fn test_end_date_before_start_rejected() {
        let mut policy = create_test_policy();
        let err = policy
            .apply_update(&PolicyUpdate { end_date: Some(on(2023, 6, 30)), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, PolicyError::Validation(_)));
    }

    #[test]
    fn test_raising_budget_and_usage_together() {
        let mut policy = create_test_policy();
        policy
            .apply_update(&PolicyUpdate {
                used_amount: Some(dec!(2500)),
                max_annual_amount: Some(dec!(3000)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(policy.remaining_budget(), Money::new(dec!(500)));
    }
}

mod queries {
    use super::*;

    #[test]
    fn test_query_matches_patient_and_status() {
        let policy = create_test_policy();

        assert!(PolicyQuery::default().matches(&policy));
        assert!(PolicyQuery::by_patient("12345678").matches(&policy));
        assert!(!PolicyQuery::by_patient("87654321").matches(&policy));
        assert!(!PolicyQuery::by_patient("12345678")
            .with_status(PolicyStatus::Cancelled)
            .matches(&policy));
    }
}

proptest! {
    #[test]
    fn prop_strict_debits_never_exceed_cap(debits in proptest::collection::vec(0i64..150_000, 0..20)) {
        let mut policy = create_test_policy();
        let mut accepted = Money::zero();

        for cents in debits {
            let amount = Money::from_minor(cents);
            if policy.debit(amount, BudgetEnforcement::Strict).is_ok() {
                accepted = accepted + amount;
            }
            prop_assert!(policy.used_amount <= policy.max_annual_amount);
        }
        prop_assert_eq!(policy.used_amount, accepted);
    }

    #[test]
    fn prop_rejected_update_leaves_policy_unchanged(used in 0i64..500_000, max in 0i64..500_000) {
        let mut policy = create_test_policy();
        let before = policy.clone();
        let update = PolicyUpdate {
            used_amount: Some(Decimal::new(used, 2)),
            max_annual_amount: Some(Decimal::new(max, 2)),
            ..Default::default()
        };

        match policy.apply_update(&update) {
            Ok(()) => prop_assert!(policy.used_amount <= policy.max_annual_amount),
            Err(_) => prop_assert_eq!(policy, before),
        }
    }
}

//! Property-Based Test Generators
//!
//! Proptest strategies producing values that already satisfy the domain
//! invariants: cent-precision amounts, percentages in [0, 100] and
//! policies whose used amount stays within the cap.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::Money;
use domain_policy::{NewPolicy, Policy};

use crate::fixtures::TemporalFixtures;

/// Positive invoice totals, 0.01 to 100 000.00
pub fn invoice_total_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Non-negative amounts, 0.00 to 100 000.00
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

pub fn money_strategy() -> impl Strategy<Value = Money> {
    (0i64..10_000_000i64).prop_map(Money::from_minor)
}

/// Coverage percentages with two decimals, 0.00 to 100.00
pub fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Usable policies with `used_amount <= max_annual_amount`
pub fn policy_strategy() -> impl Strategy<Value = Policy> {
    (percentage_strategy(), 0i64..1_000_000i64, 0u32..=100u32).prop_map(|(pct, max_cents, used_pct)| {
        let max = Decimal::new(max_cents, 2);
        let mut policy = Policy::register(
            NewPolicy {
                patient_key: "12345678".to_string(),
                insurer_name: "CNAM Tunisie".to_string(),
                policy_number: format!("PROP-{}", core_kernel::PolicyId::new_v7()),
                coverage_percentage: Some(pct),
                max_annual_amount: Some(max),
                start_date: Some(TemporalFixtures::window_start()),
                end_date: Some(TemporalFixtures::window_end()),
                ..Default::default()
            },
            Utc::now(),
        )
        .expect("generated registration is valid");
        policy.used_amount = Money::from_minor(max_cents * i64::from(used_pct) / 100);
        policy
    })
}

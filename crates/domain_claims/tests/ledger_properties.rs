//! Property tests for the claim ledger
//!
//! Random sequences of submissions and decisions are replayed against the
//! in-memory store; after every step the split, budget and ledger
//! properties must hold.

use std::sync::Arc;

use chrono::{Days, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::Money;
use domain_claims::{
    AdjudicationSettings, ClaimQuery, ClaimStatus, ClaimsAdjudicator, ClaimsPort, InMemoryStore, NewClaim,
    ProcessClaim,
};
use domain_policy::{BudgetEnforcement, NewPolicy, Policy, PolicyPort};

#[derive(Debug, Clone)]
enum Step {
    Submit(i64),
    Approve(usize),
    Reject(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (1i64..200_000).prop_map(Step::Submit),
        (0usize..16).prop_map(Step::Approve),
        (0usize..16).prop_map(Step::Reject),
    ]
}

fn policy(pct: u32, max_cents: i64) -> Policy {
    let today = Utc::now().date_naive();
    Policy::register(
        NewPolicy {
            patient_key: "12345678".to_string(),
            insurer_name: "CNAM".to_string(),
            policy_number: "CNAM-PROP".to_string(),
            coverage_percentage: Some(Decimal::from(pct)),
            max_annual_amount: Some(Decimal::new(max_cents, 2)),
            start_date: today.checked_sub_days(Days::new(1)),
            end_date: today.checked_add_days(Days::new(1)),
            ..Default::default()
        },
        Utc::now(),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_ledger_invariants_hold(pct in 0u32..=100, max_cents in 0i64..500_000, steps in proptest::collection::vec(step(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let policy = policy(pct, max_cents);
            let store = Arc::new(InMemoryStore::with_policies(vec![policy.clone()]).await);
            let adjudicator = ClaimsAdjudicator::new(store.clone(), store.clone(), AdjudicationSettings::default());
            let mut submitted = Vec::new();
            let mut previous_used = Money::zero();

            for step in steps {
                match step {
                    Step::Submit(cents) => {
                        let receipt = adjudicator
                            .submit_claim(NewClaim {
                                policy_id: policy.id,
                                invoice_reference: format!("INV-{}", submitted.len()),
                                total_amount: Decimal::new(cents, 2),
                                line_items: vec![],
                            })
                            .await
                            .unwrap();
                        let claim = receipt.claim;
                        prop_assert_eq!(claim.covered_amount + claim.patient_share, claim.total_amount);
                        submitted.push(claim.id);
                    }
                    _ if submitted.is_empty() => {}
                    Step::Approve(i) => {
                        let id = submitted[i % submitted.len()];
                        let _ = adjudicator.process_claim(id, ProcessClaim::approve()).await;
                    }
                    Step::Reject(i) => {
                        let id = submitted[i % submitted.len()];
                        let _ = adjudicator.process_claim(id, ProcessClaim::reject("property")).await;
                    }
                }

                let stored = store.get_policy(policy.id).await.unwrap();
                prop_assert!(stored.used_amount <= stored.max_annual_amount);
                prop_assert!(stored.used_amount >= previous_used);
                prop_assert_eq!(stored.used_amount, store.approved_total(policy.id).await);
                previous_used = stored.used_amount;
            }

            for record in store.find_claims(ClaimQuery::default()).await.unwrap() {
                let claim = record.claim;
                prop_assert_eq!(claim.covered_amount + claim.patient_share, claim.total_amount);
                prop_assert_eq!(claim.processed_at.is_some(), claim.status != ClaimStatus::Pending);
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_snapshot_mode_debits_exactly_covered(pct in 0u32..=100, totals in proptest::collection::vec(1i64..200_000, 1..10)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let policy = policy(pct, 100_000);
            let store = Arc::new(InMemoryStore::with_policies(vec![policy.clone()]).await);
            let settings = AdjudicationSettings {
                budget_enforcement: BudgetEnforcement::Snapshot,
                ..Default::default()
            };
            let adjudicator = ClaimsAdjudicator::new(store.clone(), store.clone(), settings);

            let mut claims = Vec::new();
            for (i, cents) in totals.iter().enumerate() {
                let receipt = adjudicator
                    .submit_claim(NewClaim {
                        policy_id: policy.id,
                        invoice_reference: format!("INV-{}", i),
                        total_amount: Decimal::new(*cents, 2),
                        line_items: vec![],
                    })
                    .await
                    .unwrap();
                claims.push(receipt.claim);
            }

            let mut expected = Money::zero();
            for claim in &claims {
                adjudicator.process_claim(claim.id, ProcessClaim::approve()).await.unwrap();
                expected = expected + claim.covered_amount;
            }

            let stored = store.get_policy(policy.id).await.unwrap();
            prop_assert_eq!(stored.used_amount, expected);
            Ok(())
        })?;
    }
}

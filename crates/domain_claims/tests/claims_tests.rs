//! Behavioural tests for the Claims Adjudicator over the in-memory store

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use core_kernel::{ClaimId, ErrorKind, Money, PolicyId};
use domain_claims::{
    AdjudicationAction, AdjudicationSettings, ClaimError, ClaimQuery, ClaimStatus, ClaimsAdjudicator, ClaimsPort,
    InMemoryStore, NewClaim, PaymentMethod, ProcessClaim, RecordReimbursement,
};
use domain_policy::{BudgetEnforcement, NewPolicy, Policy, PolicyPort, PolicyStatus};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn policy(number: &str, pct: Decimal, max: Decimal, used: Decimal) -> Policy {
    let mut policy = Policy::register(
        NewPolicy {
            patient_key: "12345678".to_string(),
            patient_name: Some("Ahmed Tounsi".to_string()),
            insurer_name: "CNAM Tunisie".to_string(),
            policy_number: number.to_string(),
            coverage_percentage: Some(pct),
            max_annual_amount: Some(max),
            start_date: today().checked_sub_days(Days::new(30)),
            end_date: today().checked_add_days(Days::new(300)),
            ..Default::default()
        },
        Utc::now(),
    )
    .unwrap();
    policy.used_amount = Money::new(used);
    policy
}

async fn setup_with(
    policies: Vec<Policy>,
    enforcement: BudgetEnforcement,
) -> (Arc<InMemoryStore>, ClaimsAdjudicator) {
    let store = Arc::new(InMemoryStore::with_policies(policies).await);
    let settings = AdjudicationSettings {
        budget_enforcement: enforcement,
        ..Default::default()
    };
    let adjudicator = ClaimsAdjudicator::new(store.clone(), store.clone(), settings);
    (store, adjudicator)
}

fn invoice(policy_id: PolicyId, total: Decimal) -> NewClaim {
    NewClaim {
        policy_id,
        invoice_reference: "INV-2024-0042".to_string(),
        total_amount: total,
        line_items: vec![json!({"code": "CONS", "label": "Consultation", "amount": 1000})],
    }
}

mod submission {
    use super::*;

    #[tokio::test]
    async fn test_submission_uses_budget_snapshot() {
        let cnam = policy("CNAM-2024-001234", dec!(70), dec!(3000), dec!(450));
        let (store, adjudicator) = setup_with(vec![cnam.clone()], BudgetEnforcement::Strict).await;

        let receipt = adjudicator.submit_claim(invoice(cnam.id, dec!(1000))).await.unwrap();

        assert_eq!(receipt.claim.status, ClaimStatus::Pending);
        assert_eq!(receipt.claim.covered_amount, Money::new(dec!(700)));
        assert_eq!(receipt.claim.patient_share, Money::new(dec!(300)));
        assert_eq!(
            receipt.message,
            "Claim submitted. Covered: 700.00 TND, Patient pays: 300.00 TND"
        );

        // nothing debited yet
        let stored = store.get_policy(cnam.id).await.unwrap();
        assert_eq!(stored.used_amount, Money::new(dec!(450)));
    }

    #[tokio::test]
    async fn test_submission_to_missing_policy() {
        let (_, adjudicator) = setup_with(vec![], BudgetEnforcement::Strict).await;

        let err = adjudicator.submit_claim(invoice(PolicyId::new_v7(), dec!(100))).await.unwrap_err();

        assert!(matches!(err, ClaimError::PolicyNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_submission_to_inactive_policy() {
        let mut suspended = policy("P-1", dec!(70), dec!(3000), dec!(0));
        suspended.status = PolicyStatus::Suspended;
        let (store, adjudicator) = setup_with(vec![suspended.clone()], BudgetEnforcement::Strict).await;

        let err = adjudicator.submit_claim(invoice(suspended.id, dec!(100))).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InactivePolicy);
        assert!(store.find_claims(ClaimQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_total_rejected_before_lookup() {
        let (_, adjudicator) = setup_with(vec![], BudgetEnforcement::Strict).await;

        let err = adjudicator.submit_claim(invoice(PolicyId::new_v7(), dec!(-5))).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_oversized_total_rejected() {
        let p = policy("CNAM-2024-001234", dec!(70), dec!(3000), dec!(0));
        let (store, adjudicator) = setup_with(vec![p.clone()], BudgetEnforcement::Strict).await;

        let huge: Decimal = "10000000000000000000000000000".parse().unwrap();
        let err = adjudicator.submit_claim(invoice(p.id, huge)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(store.find_claims(ClaimQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_line_items_round_trip() {
        let p = policy("P-1", dec!(50), dec!(3000), dec!(0));
        let (_, adjudicator) = setup_with(vec![p.clone()], BudgetEnforcement::Strict).await;

        let receipt = adjudicator.submit_claim(invoice(p.id, dec!(100))).await.unwrap();
        let fetched = adjudicator.get_claim(receipt.claim.id).await.unwrap();

        assert_eq!(fetched.claim.line_items, receipt.claim.line_items);
        assert_eq!(fetched.policy_number, "P-1");
        assert_eq!(fetched.patient_key, "12345678");
    }
}

mod processing {
    use super::*;

    #[tokio::test]
    async fn test_approval_debits_frozen_amount() {
        let cnam = policy("CNAM-2024-001234", dec!(70), dec!(3000), dec!(450));
        let (store, adjudicator) = setup_with(vec![cnam.clone()], BudgetEnforcement::Strict).await;
        let receipt = adjudicator.submit_claim(invoice(cnam.id, dec!(1000))).await.unwrap();

        let outcome = adjudicator
            .process_claim(receipt.claim.id, ProcessClaim::approve())
            .await
            .unwrap();

        assert_eq!(outcome.claim.status, ClaimStatus::Approved);
        assert!(outcome.claim.processed_at.is_some());
        assert_eq!(outcome.reimbursable_amount, Money::new(dec!(700)));
        assert_eq!(outcome.message, "Claim approved. 700.00 TND will be reimbursed.");

        let stored = store.get_policy(cnam.id).await.unwrap();
        assert_eq!(stored.used_amount, Money::new(dec!(1150)));
    }

    #[tokio::test]
    async fn test_rejection_leaves_budget_untouched() {
        let cnam = policy("CNAM-2024-001234", dec!(70), dec!(3000), dec!(450));
        let (store, adjudicator) = setup_with(vec![cnam.clone()], BudgetEnforcement::Strict).await;
        let receipt = adjudicator.submit_claim(invoice(cnam.id, dec!(1000))).await.unwrap();

        let outcome = adjudicator
            .process_claim(receipt.claim.id, ProcessClaim::reject("Invoice not itemized"))
            .await
            .unwrap();

        assert_eq!(outcome.claim.status, ClaimStatus::Rejected);
        assert_eq!(outcome.claim.rejection_reason.as_deref(), Some("Invoice not itemized"));
        assert!(outcome.reimbursable_amount.is_zero());
        assert_eq!(outcome.message, "Claim rejected: Invoice not itemized");

        let stored = store.get_policy(cnam.id).await.unwrap();
        assert_eq!(stored.used_amount, Money::new(dec!(450)));
    }

    #[tokio::test]
    async fn test_reprocessing_is_a_conflict_for_any_action() {
        let p = policy("P-1", dec!(70), dec!(3000), dec!(0));
        let (store, adjudicator) = setup_with(vec![p.clone()], BudgetEnforcement::Strict).await;
        let receipt = adjudicator.submit_claim(invoice(p.id, dec!(1000))).await.unwrap();
        adjudicator
            .process_claim(receipt.claim.id, ProcessClaim::approve())
            .await
            .unwrap();

        for action in [AdjudicationAction::Approve, AdjudicationAction::Reject] {
            let request = ProcessClaim {
                action,
                rejection_reason: Some("late".to_string()),
            };
            let err = adjudicator.process_claim(receipt.claim.id, request).await.unwrap_err();
            assert!(matches!(err, ClaimError::ClaimAlreadyProcessed { .. }));
            assert_eq!(err.kind(), ErrorKind::Conflict);
        }

        // debited exactly once
        let stored = store.get_policy(p.id).await.unwrap();
        assert_eq!(stored.used_amount, Money::new(dec!(700)));
    }

    #[tokio::test]
    async fn test_processing_unknown_claim() {
        let (_, adjudicator) = setup_with(vec![], BudgetEnforcement::Strict).await;

        let err = adjudicator
            .process_claim(ClaimId::new_v7(), ProcessClaim::approve())
            .await
            .unwrap_err();

        assert!(matches!(err, ClaimError::ClaimNotFound(_)));
    }

    #[tokio::test]
    async fn test_strict_enforcement_refuses_stale_snapshot() {
        let p = policy("P-1", dec!(100), dec!(1000), dec!(0));
        let (store, adjudicator) = setup_with(vec![p.clone()], BudgetEnforcement::Strict).await;

        // both computed against the full 1000 budget
        let first = adjudicator.submit_claim(invoice(p.id, dec!(800))).await.unwrap();
        let second = adjudicator.submit_claim(invoice(p.id, dec!(600))).await.unwrap();
        assert_eq!(second.claim.covered_amount, Money::new(dec!(600)));

        adjudicator.process_claim(first.claim.id, ProcessClaim::approve()).await.unwrap();
        let err = adjudicator
            .process_claim(second.claim.id, ProcessClaim::approve())
            .await
            .unwrap_err();

        assert!(matches!(err, ClaimError::BudgetExceeded { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let stored = store.get_policy(p.id).await.unwrap();
        assert_eq!(stored.used_amount, Money::new(dec!(800)));
        let claim = adjudicator.get_claim(second.claim.id).await.unwrap();
        assert_eq!(claim.claim.status, ClaimStatus::Pending);

        // the stale claim can still be rejected
        adjudicator
            .process_claim(second.claim.id, ProcessClaim::reject("budget exhausted"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_enforcement_debits_frozen_amounts() {
        let p = policy("P-1", dec!(100), dec!(1000), dec!(0));
        let (store, adjudicator) = setup_with(vec![p.clone()], BudgetEnforcement::Snapshot).await;

        let first = adjudicator.submit_claim(invoice(p.id, dec!(800))).await.unwrap();
        let second = adjudicator.submit_claim(invoice(p.id, dec!(600))).await.unwrap();
        adjudicator.process_claim(first.claim.id, ProcessClaim::approve()).await.unwrap();
        adjudicator.process_claim(second.claim.id, ProcessClaim::approve()).await.unwrap();

        let stored = store.get_policy(p.id).await.unwrap();
        assert_eq!(stored.used_amount, Money::new(dec!(1400)));
    }

    #[tokio::test]
    async fn test_concurrent_approvals_serialize_debits() {
        let p = policy("P-1", dec!(10), dec!(100000), dec!(0));
        let (store, adjudicator) = setup_with(vec![p.clone()], BudgetEnforcement::Strict).await;

        let mut ids = Vec::new();
        for _ in 0..20 {
            ids.push(adjudicator.submit_claim(invoice(p.id, dec!(1000))).await.unwrap().claim.id);
        }

        let handles: Vec<_> = ids
            .iter()
            .map(|id| {
                let adjudicator = adjudicator.clone();
                let id = *id;
                tokio::spawn(async move { adjudicator.process_claim(id, ProcessClaim::approve()).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store.get_policy(p.id).await.unwrap();
        assert_eq!(stored.used_amount, Money::new(dec!(2000)));
        assert_eq!(store.approved_total(p.id).await, stored.used_amount);
    }

    #[tokio::test]
    async fn test_concurrent_double_approval_applies_once() {
        let p = policy("P-1", dec!(70), dec!(3000), dec!(0));
        let (store, adjudicator) = setup_with(vec![p.clone()], BudgetEnforcement::Strict).await;
        let id = adjudicator.submit_claim(invoice(p.id, dec!(1000))).await.unwrap().claim.id;

        let a = {
            let adjudicator = adjudicator.clone();
            tokio::spawn(async move { adjudicator.process_claim(id, ProcessClaim::approve()).await })
        };
        let b = {
            let adjudicator = adjudicator.clone();
            tokio::spawn(async move { adjudicator.process_claim(id, ProcessClaim::approve()).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let stored = store.get_policy(p.id).await.unwrap();
        assert_eq!(stored.used_amount, Money::new(dec!(700)));
    }
}

mod reimbursements {
    use super::*;

    #[tokio::test]
    async fn test_reimbursement_pays_covered_amount_once() {
        let p = policy("P-1", dec!(70), dec!(3000), dec!(0));
        let (_, adjudicator) = setup_with(vec![p.clone()], BudgetEnforcement::Strict).await;
        let id = adjudicator.submit_claim(invoice(p.id, dec!(1000))).await.unwrap().claim.id;
        adjudicator.process_claim(id, ProcessClaim::approve()).await.unwrap();

        let request = RecordReimbursement {
            payment_method: PaymentMethod::Check,
            bank_account: None,
        };
        let reimbursement = adjudicator.record_reimbursement(id, request.clone()).await.unwrap();
        assert_eq!(reimbursement.amount, Money::new(dec!(700)));
        assert_eq!(reimbursement.payment_method, PaymentMethod::Check);

        let err = adjudicator.record_reimbursement(id, request).await.unwrap_err();
        assert!(matches!(err, ClaimError::DuplicateReimbursement(_)));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let stored = adjudicator.get_reimbursement(id).await.unwrap().unwrap();
        assert_eq!(stored.id, reimbursement.id);
    }

    #[tokio::test]
    async fn test_reimbursement_requires_approval() {
        let p = policy("P-1", dec!(70), dec!(3000), dec!(0));
        let (_, adjudicator) = setup_with(vec![p.clone()], BudgetEnforcement::Strict).await;
        let pending = adjudicator.submit_claim(invoice(p.id, dec!(1000))).await.unwrap().claim.id;
        let rejected = adjudicator.submit_claim(invoice(p.id, dec!(500))).await.unwrap().claim.id;
        adjudicator.process_claim(rejected, ProcessClaim::reject("duplicate")).await.unwrap();

        for id in [pending, rejected] {
            let err = adjudicator
                .record_reimbursement(id, RecordReimbursement::default())
                .await
                .unwrap_err();
            assert!(matches!(err, ClaimError::ClaimNotApproved { .. }));
        }
    }

    #[tokio::test]
    async fn test_default_payment_method_and_bank_account() {
        let p = policy("P-1", dec!(70), dec!(3000), dec!(0));
        let (_, adjudicator) = setup_with(vec![p.clone()], BudgetEnforcement::Strict).await;
        let id = adjudicator.submit_claim(invoice(p.id, dec!(100))).await.unwrap().claim.id;
        adjudicator.process_claim(id, ProcessClaim::approve()).await.unwrap();

        let reimbursement = adjudicator
            .record_reimbursement(
                id,
                RecordReimbursement {
                    bank_account: Some(" TN59 1000 6035 1835 9847 8831 ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(reimbursement.payment_method, PaymentMethod::BankTransfer);
        assert_eq!(reimbursement.bank_account.as_deref(), Some("TN59 1000 6035 1835 9847 8831"));
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn test_list_claims_filters() {
        let a = policy("A", dec!(70), dec!(3000), dec!(0));
        let b = policy("B", dec!(20), dec!(2000), dec!(0));
        let (_, adjudicator) = setup_with(vec![a.clone(), b.clone()], BudgetEnforcement::Strict).await;

        let first = adjudicator.submit_claim(invoice(a.id, dec!(100))).await.unwrap().claim.id;
        adjudicator.submit_claim(invoice(a.id, dec!(200))).await.unwrap();
        adjudicator.submit_claim(invoice(b.id, dec!(300))).await.unwrap();
        adjudicator.process_claim(first, ProcessClaim::approve()).await.unwrap();

        assert_eq!(adjudicator.list_claims(ClaimQuery::default()).await.unwrap().len(), 3);
        assert_eq!(adjudicator.list_claims(ClaimQuery::by_policy(a.id)).await.unwrap().len(), 2);

        let approved = adjudicator
            .list_claims(ClaimQuery::by_policy(a.id).with_status(ClaimStatus::Approved))
            .await
            .unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].claim.id, first);
        assert_eq!(approved[0].insurer_name, "CNAM Tunisie");
    }
}

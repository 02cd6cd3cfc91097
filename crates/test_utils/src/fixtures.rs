//! Pre-built Test Fixtures
//!
//! Ready-to-use registrations and invoices shaped after the demo contracts
//! the engine seeds: a patient holding a complete CNAM policy and a
//! complementary STAR policy.

use chrono::{Days, NaiveDate, Utc};
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use core_kernel::PolicyId;
use domain_claims::NewClaim;
use domain_policy::{CoverageType, NewPolicy};

/// Patient key fixtures
pub struct PatientFixtures;

impl PatientFixtures {
    /// Patient holding both demo contracts
    pub fn covered() -> &'static str {
        "12345678"
    }

    /// Patient with no policy at all
    pub fn uncovered() -> &'static str {
        "00000000"
    }

    /// Random display name
    pub fn name() -> String {
        Name().fake()
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Start of a validity window that contains today
    pub fn window_start() -> NaiveDate {
        Self::today().checked_sub_days(Days::new(30)).unwrap_or(NaiveDate::MIN)
    }

    /// End of a validity window that contains today
    pub fn window_end() -> NaiveDate {
        Self::today().checked_add_days(Days::new(335)).unwrap_or(NaiveDate::MAX)
    }

    /// A window that closed yesterday
    pub fn lapsed_window() -> (NaiveDate, NaiveDate) {
        let end = Self::today().checked_sub_days(Days::new(1)).unwrap_or(NaiveDate::MIN);
        let start = end.checked_sub_days(Days::new(365)).unwrap_or(NaiveDate::MIN);
        (start, end)
    }
}

/// Policy registration fixtures
pub struct PolicyFixtures;

impl PolicyFixtures {
    /// Complete CNAM contract: 70 % up to 3000 per year
    pub fn cnam_complete() -> NewPolicy {
        NewPolicy {
            patient_key: PatientFixtures::covered().to_string(),
            patient_name: Some("Ahmed Tounsi".to_string()),
            insurer_name: "CNAM Tunisie".to_string(),
            policy_number: "CNAM-2024-001234".to_string(),
            coverage_type: Some(CoverageType::Complete),
            coverage_percentage: Some(dec!(70)),
            max_annual_amount: Some(dec!(3000)),
            start_date: Some(TemporalFixtures::window_start()),
            end_date: Some(TemporalFixtures::window_end()),
        }
    }

    /// Complementary STAR contract: 20 % up to 500 per year
    pub fn star_complementary() -> NewPolicy {
        NewPolicy {
            patient_key: PatientFixtures::covered().to_string(),
            patient_name: Some("Ahmed Tounsi".to_string()),
            insurer_name: "STAR Assurances".to_string(),
            policy_number: "STAR-MED-2024-5678".to_string(),
            coverage_type: Some(CoverageType::Complementary),
            coverage_percentage: Some(dec!(20)),
            max_annual_amount: Some(dec!(500)),
            start_date: Some(TemporalFixtures::window_start()),
            end_date: Some(TemporalFixtures::window_end()),
        }
    }

    /// Registration relying on every default
    pub fn minimal(policy_number: &str) -> NewPolicy {
        NewPolicy {
            patient_key: PatientFixtures::covered().to_string(),
            insurer_name: "CNAM Tunisie".to_string(),
            policy_number: policy_number.to_string(),
            start_date: Some(TemporalFixtures::window_start()),
            end_date: Some(TemporalFixtures::window_end()),
            ..Default::default()
        }
    }
}

/// Invoice fixtures
pub struct ClaimFixtures;

impl ClaimFixtures {
    /// Invoice lines as a pharmacy would send them
    pub fn line_items() -> Vec<Value> {
        vec![
            json!({"description": "Consultation", "quantity": 1, "unit_price": "60.00"}),
            json!({"description": "Amoxicilline 1g", "quantity": 2, "unit_price": "12.50"}),
        ]
    }

    /// Invoice against `policy_id`
    pub fn invoice(policy_id: PolicyId, total: Decimal) -> NewClaim {
        NewClaim {
            policy_id,
            invoice_reference: format!("INV-{}", Utc::now().timestamp_micros()),
            total_amount: total,
            line_items: Self::line_items(),
        }
    }
}

//! Policy Aggregate
//!
//! A policy is one patient–insurer contract. It owns the annual budget
//! state that the claims adjudicator debits on approval.
//!
//! # Invariants
//!
//! - `used_amount <= max_annual_amount` for every policy written through
//!   [`Policy::apply_update`] or [`Policy::debit`] under strict enforcement
//! - `coverage_percentage` lies in [0, 100]
//! - amounts are non-negative and carried at cent precision
//! - the validity period never ends before it starts

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CoveragePeriod, Money, Percentage, PolicyId};

use crate::error::PolicyError;

/// Coverage percentage applied when registration omits it
pub const DEFAULT_COVERAGE_PERCENTAGE: Decimal = dec!(80);

/// Annual budget applied when registration omits it
pub const DEFAULT_MAX_ANNUAL_AMOUNT: Decimal = dec!(5000);

/// Kind of contract held with the insurer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    #[default]
    Basic,
    Complementary,
    Complete,
}

impl CoverageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageType::Basic => "basic",
            CoverageType::Complementary => "complementary",
            CoverageType::Complete => "complete",
        }
    }
}

impl fmt::Display for CoverageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoverageType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(CoverageType::Basic),
            "complementary" => Ok(CoverageType::Complementary),
            "complete" => Ok(CoverageType::Complete),
            other => Err(PolicyError::validation(format!("unknown coverage type '{}'", other))),
        }
    }
}

/// Administrative status of a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    #[default]
    Active,
    Suspended,
    Expired,
    Cancelled,
}

impl PolicyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::Active => "active",
            PolicyStatus::Suspended => "suspended",
            PolicyStatus::Expired => "expired",
            PolicyStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyStatus {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(PolicyStatus::Active),
            "suspended" => Ok(PolicyStatus::Suspended),
            "expired" => Ok(PolicyStatus::Expired),
            "cancelled" => Ok(PolicyStatus::Cancelled),
            other => Err(PolicyError::validation(format!("unknown policy status '{}'", other))),
        }
    }
}

/// How approvals treat the annual cap
///
/// Claims freeze their covered amount at submission. Under `Strict` an
/// approval whose debit would push `used_amount` past `max_annual_amount`
/// is refused; under `Snapshot` the frozen amount is debited regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetEnforcement {
    #[default]
    Strict,
    Snapshot,
}

impl FromStr for BudgetEnforcement {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(BudgetEnforcement::Strict),
            "snapshot" => Ok(BudgetEnforcement::Snapshot),
            other => Err(PolicyError::validation(format!("unknown budget enforcement '{}'", other))),
        }
    }
}

/// An insurance contract between a patient and an insurer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    /// Opaque reference into the external patient directory
    pub patient_key: String,
    /// Display name as supplied by the identity collaborator
    pub patient_name: String,
    pub insurer_name: String,
    /// Globally unique
    pub policy_number: String,
    pub coverage_type: CoverageType,
    pub coverage_percentage: Percentage,
    pub max_annual_amount: Money,
    pub used_amount: Money,
    pub validity: CoveragePeriod,
    pub status: PolicyStatus,
    pub created_at: DateTime<Utc>,
}

/// Registration input for a new policy
///
/// Optional fields fall back to the registration defaults (basic coverage,
/// 80 %, 5000 annual budget).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPolicy {
    pub patient_key: String,
    pub patient_name: Option<String>,
    pub insurer_name: String,
    pub policy_number: String,
    pub coverage_type: Option<CoverageType>,
    pub coverage_percentage: Option<Decimal>,
    pub max_annual_amount: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Partial update of a policy
///
/// Only these fields are administratively mutable; everything else is
/// fixed at registration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyUpdate {
    pub status: Option<PolicyStatus>,
    pub used_amount: Option<Decimal>,
    pub coverage_percentage: Option<Decimal>,
    pub max_annual_amount: Option<Decimal>,
    pub end_date: Option<NaiveDate>,
}

impl PolicyUpdate {
    /// Returns true if the update carries no field
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.used_amount.is_none()
            && self.coverage_percentage.is_none()
            && self.max_annual_amount.is_none()
            && self.end_date.is_none()
    }
}

/// Query parameters for listing policies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyQuery {
    pub patient_key: Option<String>,
    pub status: Option<PolicyStatus>,
}

impl PolicyQuery {
    /// All policies held by one patient
    pub fn by_patient(patient_key: impl Into<String>) -> Self {
        Self {
            patient_key: Some(patient_key.into()),
            status: None,
        }
    }

    /// Restricts the query to one status
    pub fn with_status(mut self, status: PolicyStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true if `policy` satisfies every filter
    pub fn matches(&self, policy: &Policy) -> bool {
        self.patient_key.as_ref().map_or(true, |k| &policy.patient_key == k)
            && self.status.map_or(true, |s| policy.status == s)
    }
}

/// Masks all but the last four characters of a patient key for logging
pub fn mask_patient_key(patient_key: &str) -> String {
    let count = patient_key.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let visible: String = patient_key.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), visible)
}

fn required(value: &str, field: &str) -> Result<String, PolicyError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PolicyError::MissingRequiredField(field.to_string()));
    }
    Ok(trimmed.to_string())
}

impl Policy {
    /// Validates a registration request and builds the policy
    ///
    /// The new policy starts `active` with nothing used.
    pub fn register(new: NewPolicy, now: DateTime<Utc>) -> Result<Self, PolicyError> {
        let patient_key = required(&new.patient_key, "patient_key")?;
        let insurer_name = required(&new.insurer_name, "insurer_name")?;
        let policy_number = required(&new.policy_number, "policy_number")?;
        let start_date = new
            .start_date
            .ok_or_else(|| PolicyError::MissingRequiredField("start_date".to_string()))?;
        let end_date = new
            .end_date
            .ok_or_else(|| PolicyError::MissingRequiredField("end_date".to_string()))?;

        let coverage_percentage =
            Percentage::new(new.coverage_percentage.unwrap_or(DEFAULT_COVERAGE_PERCENTAGE))?;
        let max_annual_amount =
            Money::non_negative(new.max_annual_amount.unwrap_or(DEFAULT_MAX_ANNUAL_AMOUNT))?;

        Ok(Self {
            id: PolicyId::new_v7(),
            patient_key,
            patient_name: new.patient_name.map(|n| n.trim().to_string()).unwrap_or_default(),
            insurer_name,
            policy_number,
            coverage_type: new.coverage_type.unwrap_or_default(),
            coverage_percentage,
            max_annual_amount,
            used_amount: Money::zero(),
            validity: CoveragePeriod::new(start_date, end_date)?,
            status: PolicyStatus::Active,
            created_at: now,
        })
    }

    /// `max_annual_amount - used_amount`
    ///
    /// Negative only if approvals were allowed past the cap (snapshot
    /// enforcement).
    pub fn remaining_budget(&self) -> Money {
        self.max_annual_amount - self.used_amount
    }

    /// Status as observed on `today`
    ///
    /// An active policy outside its validity window reads as expired.
    pub fn effective_status(&self, today: NaiveDate) -> PolicyStatus {
        match self.status {
            PolicyStatus::Active if !self.validity.contains(today) => PolicyStatus::Expired,
            status => status,
        }
    }

    /// Returns true if the policy may cover an invoice dated `today`
    pub fn is_usable_on(&self, today: NaiveDate) -> bool {
        self.effective_status(today) == PolicyStatus::Active
    }

    /// Applies an administrative update, keeping every invariant
    ///
    /// The update is validated as a whole before any field changes, so a
    /// rejected update leaves the policy untouched.
    pub fn apply_update(&mut self, update: &PolicyUpdate) -> Result<(), PolicyError> {
        if update.is_empty() {
            return Err(PolicyError::NoFieldsToUpdate);
        }

        let used_amount = match update.used_amount {
            Some(amount) => Money::non_negative(amount)?,
            None => self.used_amount,
        };
        let max_annual_amount = match update.max_annual_amount {
            Some(amount) => Money::non_negative(amount)?,
            None => self.max_annual_amount,
        };
        let coverage_percentage = match update.coverage_percentage {
            Some(pct) => Percentage::new(pct)?,
            None => self.coverage_percentage,
        };
        let validity = match update.end_date {
            Some(end_date) => self.validity.with_end_date(end_date)?,
            None => self.validity,
        };

        let budget_changed = update.used_amount.is_some() || update.max_annual_amount.is_some();
        if budget_changed && used_amount > max_annual_amount {
            return Err(PolicyError::BudgetExceeded {
                used: used_amount,
                max: max_annual_amount,
            });
        }

        self.used_amount = used_amount;
        self.max_annual_amount = max_annual_amount;
        self.coverage_percentage = coverage_percentage;
        self.validity = validity;
        if let Some(status) = update.status {
            self.status = status;
        }
        Ok(())
    }

    /// Returns true if debiting `amount` keeps the policy within its cap
    pub fn can_absorb(&self, amount: Money) -> bool {
        self.used_amount + amount <= self.max_annual_amount
    }

    /// Adds an approved claim's covered amount to the used budget
    pub fn debit(&mut self, amount: Money, enforcement: BudgetEnforcement) -> Result<(), PolicyError> {
        if amount.is_negative() {
            return Err(PolicyError::validation("debit amount must not be negative"));
        }
        if enforcement == BudgetEnforcement::Strict && !self.can_absorb(amount) {
            return Err(PolicyError::BudgetExceeded {
                used: self.used_amount + amount,
                max: self.max_annual_amount,
            });
        }
        self.used_amount = self.used_amount + amount;
        Ok(())
    }
}

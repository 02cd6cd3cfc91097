//! Collaborator-facing request and response shapes
//!
//! Requests are deserialized from camelCase, validated with `validator`
//! and only then converted into domain inputs. Responses render every
//! monetary value as a fixed two-decimal string.

pub mod claims;
pub mod coverage;
pub mod policy;

use core_kernel::{MAX_AMOUNT, PERCENTAGE_SCALE};
use rust_decimal::Decimal;
use validator::{ValidationError, ValidationErrors};

pub use claims::{
    ClaimProcessingResponse, ClaimResponse, ClaimSubmissionResponse, ProcessClaimRequest, ReimbursementRequest,
    ReimbursementResponse, SubmitClaimRequest,
};
pub use coverage::{CoverageVerificationResponse, PolicyContributionResponse, VerifyCoverageRequest};
pub use policy::{PolicyResponse, RegisterPolicyRequest, UpdatePolicyRequest};

pub(crate) fn invalid(code: &'static str, message: impl Into<std::borrow::Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

pub(crate) fn check_non_negative(value: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid("negative_amount", format!("{} must not be negative", field)));
    }
    check_upper_bound(value, field)
}

pub(crate) fn check_upper_bound(value: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if value > MAX_AMOUNT {
        return Err(invalid("amount_too_large", format!("{} must not exceed {}", field, MAX_AMOUNT)));
    }
    Ok(())
}

pub(crate) fn check_percentage(value: Decimal) -> Result<(), ValidationError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(invalid("percentage_range", "coveragePercentage must lie in [0, 100]"));
    }
    if value.normalize().scale() > PERCENTAGE_SCALE {
        return Err(invalid(
            "percentage_precision",
            "coveragePercentage must have at most two decimal places",
        ));
    }
    Ok(())
}

/// Flattens validation errors into one line, field by field
pub fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_non_negative_accepts_zero() {
        assert!(check_non_negative(dec!(0), "amount").is_ok());
        assert!(check_non_negative(dec!(-0.01), "amount").is_err());
    }

    #[test]
    fn test_amount_upper_bound() {
        assert!(check_non_negative(MAX_AMOUNT, "amount").is_ok());
        let error = check_non_negative(dec!(1000000000000), "amount").unwrap_err();
        assert_eq!(error.code, "amount_too_large");
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(check_percentage(dec!(0)).is_ok());
        assert!(check_percentage(dec!(100)).is_ok());
        assert!(check_percentage(dec!(100.01)).is_err());
        assert!(check_percentage(dec!(-1)).is_err());
    }

    #[test]
    fn test_percentage_precision() {
        assert!(check_percentage(dec!(33.33)).is_ok());
        assert!(check_percentage(dec!(33.330)).is_ok());
        assert_eq!(check_percentage(dec!(33.333)).unwrap_err().code, "percentage_precision");
    }
}

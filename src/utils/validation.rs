//! Validation utilities

use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that an amount is zero or positive
pub fn validate_non_negative_amount(field: &str, amount: &BigDecimal) -> LedgerResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(LedgerError::Validation(format!(
            "{} cannot be negative",
            field
        )))
    } else {
        Ok(())
    }
}

/// Validate that a required text field is present
pub fn validate_required(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::Validation(format!("{} is required", field)));
    }

    if value.len() > 500 {
        return Err(LedgerError::Validation(format!(
            "{} cannot exceed 500 characters",
            field
        )));
    }

    Ok(())
}

/// Validate that a category label is usable for grouping
pub fn validate_category(category: &Category) -> LedgerResult<()> {
    if category.is_empty() {
        return Err(LedgerError::Validation(
            "Category is required".to_string(),
        ));
    }

    if category.as_str().chars().count() > 50 {
        return Err(LedgerError::Validation(
            "Category cannot exceed 50 characters".to_string(),
        ));
    }

    Ok(())
}

/// Parse a user supplied amount such as `"1500"` or `"1500.50"`
pub fn parse_amount(field: &str, raw: &str) -> LedgerResult<BigDecimal> {
    let amount: BigDecimal = raw.trim().parse().map_err(|_| {
        LedgerError::Validation(format!("{} must be a number, got '{}'", field, raw.trim()))
    })?;
    validate_non_negative_amount(field, &amount)?;
    Ok(amount)
}

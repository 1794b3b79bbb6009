// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;

/// Validates that an hourly rate is billable.
///
/// # Arguments
///
/// * `rate` - The rate to validate
///
/// # Errors
///
/// Returns `DomainError::InvalidHourlyRate` if the rate is not a positive
/// finite amount.
pub fn validate_hourly_rate(rate: f64) -> Result<(), DomainError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(DomainError::InvalidHourlyRate { rate });
    }
    Ok(())
}

/// Validates that an identifier field is non-empty.
///
/// # Arguments
///
/// * `field` - The field name, for error reporting
/// * `value` - The identifier value
///
/// # Errors
///
/// Returns `DomainError::InvalidIdentifier` if the value is empty or
/// whitespace-only.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::InvalidIdentifier { field });
    }
    Ok(())
}

//! Request validation helpers.
//!
//! Business rules for request fields that the JSON extractors cannot express.
//! Violations are reported as `AppError::InvalidArgument` naming the field.

use crate::AppError;

/// Maximum length of a record name.
pub const MAX_NAME_LENGTH: usize = 255;

/// Build an `InvalidArgument` error for a single field.
fn field_violation(field: &str, description: &str) -> AppError {
    AppError::InvalidArgument(format!("{field}: {description}"))
}

/// Validate a record display name (authenticator, saved filter).
///
/// # Errors
/// Returns `AppError::InvalidArgument` if the name is blank or too long.
pub fn validate_name(field: &str, name: &str) -> Result<(), AppError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(field_violation(field, "must not be empty"));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(field_violation(
            field,
            &format!("must not exceed {MAX_NAME_LENGTH} characters"),
        ));
    }

    Ok(())
}

/// Validate that a required field is present.
///
/// # Errors
/// Returns `AppError::InvalidArgument` if the value is `None`.
pub fn require<T>(field: &str, value: Option<T>) -> Result<T, AppError> {
    value.ok_or_else(|| field_violation(field, "is required"))
}

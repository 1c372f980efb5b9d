//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! Request DTOs derive [`validator::Validate`]; [`validate_request`] maps the
//! collected field errors onto [`AppError`].

use shared::error::AppError;
use validator::Validate;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: dish, guest, location, dish id
pub const MAX_NAME_LEN: usize = 200;

/// Notes, descriptions (reservation note, dish description, delivery note)
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: phone, table token
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// URLs / image paths
pub const MAX_URL_LEN: usize = 2048;

/// Addresses
pub const MAX_ADDRESS_LEN: usize = 500;

// `#[validate(length(..))]` 的边界是 u64
pub const MAX_NAME_LEN_U64: u64 = MAX_NAME_LEN as u64;
pub const MAX_NOTE_LEN_U64: u64 = MAX_NOTE_LEN as u64;
pub const MAX_SHORT_TEXT_LEN_U64: u64 = MAX_SHORT_TEXT_LEN as u64;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Run derive-based validation on a request DTO
pub fn validate_request<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(|errors| {
        let mut fields: Vec<String> = errors.errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        AppError::validation(format!("Invalid fields: {}", fields.join(", ")))
            .with_detail("fields", fields)
    })
}

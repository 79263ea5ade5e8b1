//! Input rules for registration and profile updates.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static email pattern"));

pub const MIN_PASSWORD_LEN: usize = 6;

/// Caller-supplied registration data, before hashing and identifier generation.
#[derive(Debug, Clone, Default)]
pub struct UserDraft {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub referrer_id: Option<i64>,
}

pub fn require_non_blank(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation("blank_field".to_string(), format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    require_non_blank("email", email)?;
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::validation("invalid_email", "Invalid email address"));
    }
    Ok(())
}

/// At least six characters once trimmed, one digit and one uppercase letter.
pub fn validate_password(password: &str) -> AppResult<()> {
    require_non_blank("password", password)?;
    if password.trim().chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("weak_password", "Password must be at least 6 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::validation("weak_password", "Password must contain a number"));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(AppError::validation("weak_password", "Password must contain an uppercase letter"));
    }
    Ok(())
}

pub fn validate_draft(draft: &UserDraft) -> AppResult<()> {
    validate_email(&draft.email)?;
    validate_password(&draft.password)?;
    require_non_blank("firstName", &draft.first_name)?;
    require_non_blank("lastName", &draft.last_name)?;
    require_non_blank("phoneNumber", &draft.phone_number)?;
    Ok(())
}

pub fn validate_balance(balance: i64) -> AppResult<()> {
    if balance < 0 {
        return Err(AppError::validation("negative_balance", "Balance cannot be negative"));
    }
    Ok(())
}

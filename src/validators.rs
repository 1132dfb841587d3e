/// Input validators for user and record payloads
/// 1. Length limits on every free-form field
/// 2. Username charset restriction
/// 3. Control character rejection in record bodies

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 32;
const MAX_MESSAGE_BODY_LENGTH: usize = 4096;

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
}

/// Validates a username
/// - 3 to 32 characters after trimming
/// - Letters, digits, `_`, `.` and `-` only
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if trimmed.chars().count() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort("username".to_string(), MIN_USERNAME_LENGTH));
    }

    if trimmed.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username".to_string(), MAX_USERNAME_LENGTH));
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a record body
/// - Non-empty after trimming, at most 4096 characters
/// - No control characters except newline, carriage return and tab
pub fn is_valid_message_body(body: &str) -> Result<String, ValidationError> {
    let trimmed = body.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("message_body".to_string()));
    }

    if trimmed.chars().count() > MAX_MESSAGE_BODY_LENGTH {
        return Err(ValidationError::TooLong(
            "message_body".to_string(),
            MAX_MESSAGE_BODY_LENGTH,
        ));
    }

    if trimmed
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(ValidationError::InvalidFormat("message_body".to_string()));
    }

    Ok(trimmed.to_string())
}

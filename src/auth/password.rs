/// Password Hashing and Verification
///
/// Handles password hashing with bcrypt and password strength validation.

use bcrypt::{hash, verify};
use lazy_static::lazy_static;

use crate::error::{AppError, ValidationError};

/// bcrypt cost factor, roughly 100ms per verification on commodity hardware
pub const HASH_COST: u32 = 11;

const MIN_PASSWORD_LENGTH: usize = 8;
// bcrypt ignores everything past 72 bytes
const MAX_PASSWORD_LENGTH: usize = 72;

lazy_static! {
    // Same cost as real hashes, so a lookup miss takes as long as a mismatch.
    static ref DUMMY_HASH: Option<String> = match hash("timing-equalization-placeholder", HASH_COST) {
        Ok(dummy) => Some(dummy),
        Err(e) => {
            tracing::error!(error = %e, "Could not compute dummy hash; hashing per request instead");
            None
        }
    };
}

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if:
/// - Password fails validation (too short, weak, etc.)
/// - Bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_strength(password)?;

    hash(password, HASH_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its stored hash
///
/// A mismatch and an unparseable hash both return `false`.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match verify(password, stored_hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be verified");
            false
        }
    }
}

/// Burn one verification worth of CPU against a dummy hash
///
/// Called when the username is unknown.
pub fn equalize_timing(password: &str) {
    match DUMMY_HASH.as_deref() {
        Some(dummy) => {
            let _ = verify(password, dummy);
        }
        None => {
            let _ = hash(password, HASH_COST);
        }
    }
}

/// Compute the dummy hash now instead of on the first unknown username
pub fn prepare_timing_equalization() {
    lazy_static::initialize(&DUMMY_HASH);
}

/// Validate password strength requirements
///
/// Requirements:
/// - 8 to 72 bytes
/// - At least one digit, one lowercase and one uppercase letter
fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )));
    }

    Ok(())
}

//! Password rules applied before anything reaches the auth provider.

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Why a new password was rejected.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordError {
    /// The confirmation field differs from the new password.
    #[error("passwords do not match")]
    Mismatch,
    /// Shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("password must be at least {min} characters")]
    TooShort {
        /// Required minimum length.
        min: usize,
    },
}

/// Check a new password and its confirmation.
///
/// The mismatch check runs first, so a short password typed differently
/// twice reports [`PasswordError::Mismatch`].
///
/// # Errors
///
/// Returns [`PasswordError`] describing the first failed rule.
pub fn validate_new_password(new: &str, confirmation: &str) -> Result<(), PasswordError> {
    if new != confirmation {
        return Err(PasswordError::Mismatch);
    }
    if new.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_wins_over_length() {
        assert_eq!(validate_new_password("abc", "abd"), Err(PasswordError::Mismatch));
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            validate_new_password("12345", "12345"),
            Err(PasswordError::TooShort { min: 6 })
        );
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // five characters, ten bytes
        assert!(validate_new_password("ççççç", "ççççç").is_err());
        assert!(validate_new_password("çççççç", "çççççç").is_ok());
    }
}

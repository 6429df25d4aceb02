//! Argon2 password hashing and the registration strength rules.

use anyhow::Context;
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};

use crate::error::AccountsServiceError;

/// Passwords rejected outright regardless of character classes.
const COMMON_PASSWORDS: [&str; 5] = ["password", "12345678", "qwerty", "abc123", "password123"];

/// Hash with Argon2id defaults on the blocking pool; hashing is CPU-bound.
pub async fn hash_password(password: &str) -> Result<String, AccountsServiceError> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .context("password hashing task panicked")?
    .map_err(|e| anyhow::anyhow!("argon2 hashing failed: {e}"))?;
    Ok(hash)
}

/// Verify a password against a stored PHC string on the blocking pool.
/// An unparseable stored hash verifies as `false`.
pub async fn verify_password(
    password: &str,
    password_hash: &str,
) -> Result<bool, AccountsServiceError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let matches = tokio::task::spawn_blocking(move || match PasswordHash::new(&password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    })
    .await
    .context("password verify task panicked")?;
    Ok(matches)
}

/// Strength rules: at least 8 chars, all four character classes, not on the
/// common-password list.
pub fn validate_password_strength(password: &str) -> Result<(), AccountsServiceError> {
    if password.chars().count() < 8 {
        return Err(AccountsServiceError::Validation(
            "Password must be at least 8 characters long".to_owned(),
        ));
    }

    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| c.is_ascii_punctuation());

    let mut missing = Vec::new();
    if !has_lowercase {
        missing.push("lowercase letter");
    }
    if !has_uppercase {
        missing.push("uppercase letter");
    }
    if !has_digit {
        missing.push("number");
    }
    if !has_special {
        missing.push("special character");
    }
    if !missing.is_empty() {
        return Err(AccountsServiceError::Validation(format!(
            "Password must contain: {}",
            missing.join(", ")
        )));
    }

    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        return Err(AccountsServiceError::Validation(
            "Password is too common".to_owned(),
        ));
    }

    Ok(())
}

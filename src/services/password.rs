//! Password hashing
//!
//! Passwords are stored as Argon2id PHC strings with a random salt per
//! account. Strength rules live here too so registration and password
//! changes apply the same checks.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password using Argon2id with the crate's default parameters.
///
/// The returned string carries algorithm, parameters and salt, so it can be
/// passed straight back to [`verify_password`].
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored hash.
///
/// A mismatch is `Ok(false)`; only a malformed hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
        .context("Failed to parse password hash")?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e))
            .context("Password verification error"),
    }
}

/// Check a new password against the configured minimum length.
///
/// Length is counted in characters, not bytes.
pub fn validate_password(password: &str, min_length: usize) -> Result<(), String> {
    if password.trim().is_empty() {
        return Err("Password is required".to_string());
    }
    if password.chars().count() < min_length {
        return Err(format!(
            "Password must be at least {} characters",
            min_length
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_produces_argon2id_hash() {
        let hash = hash_password("board_password_1").expect("Failed to hash password");
        assert!(hash.starts_with("$argon2id$"), "Hash should use Argon2id");
    }

    #[test]
    fn test_same_password_different_salts() {
        let hash1 = hash_password("same_password").expect("Failed to hash password");
        let hash2 = hash_password("same_password").expect("Failed to hash password");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password_correct_and_incorrect() {
        let hash = hash_password("correct_password").expect("Failed to hash password");

        assert!(verify_password("correct_password", &hash).expect("Verification should not error"));
        assert!(!verify_password("wrong_password", &hash).expect("Verification should not error"));
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "invalid_hash_format").is_err());
    }

    #[test]
    fn test_hash_password_unicode() {
        let password = "пароль🔐ok";
        let hash = hash_password(password).expect("Failed to hash unicode password");
        assert!(verify_password(password, &hash).expect("Verification should not error"));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("", 8).is_err());
        assert!(validate_password("        ", 8).is_err());
        assert!(validate_password("short", 8).is_err());
        assert!(validate_password("longenough", 8).is_ok());
        // Eight characters, more than eight bytes
        assert!(validate_password("ääääääää", 8).is_ok());
    }
}

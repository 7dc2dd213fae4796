//! Password hashing and verification (Argon2id)
//!
//! The hash is deliberately slow and memory-hard; async callers go through
//! the `spawn_blocking` wrappers so a pending hash never pins a runtime
//! worker that must stay responsive to cancellation. The hash itself is
//! side-effect free, so a cancelled caller leaves no partial state.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{AuthError, AuthResult};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a password into PHC string format
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            tracing::error!(error = %err, "argon2 hashing failed");
            AuthError::Internal
        })
}

/// Verify a password against a stored PHC hash
///
/// A mismatch is `Ok(false)`; a malformed stored hash is an internal error
/// because it means our own persisted data is corrupt.
pub fn verify_password(stored_hash: &str, password: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|err| {
        tracing::error!(error = %err, "stored password hash failed to parse");
        AuthError::Internal
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Async wrapper: run the hash off the async worker threads
pub async fn hash_password_async(password: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "password hashing task failed");
            AuthError::Internal
        })?
}

/// Async wrapper around [`verify_password`]
pub async fn verify_password_async(stored_hash: String, password: String) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&stored_hash, &password))
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "password verification task failed");
            AuthError::Internal
        })?
}

/// Burn one hash computation so "unknown email" and "wrong password" take
/// comparable time. The result is discarded.
pub async fn burn_password_hash(password: String) {
    let _ = hash_password_async(password).await;
}

/// Minimal strength policy: length bounds plus at least one letter and digit
pub fn validate_password_strength(password: &str) -> Result<(), &'static str> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters");
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err("Password must be at most 128 characters");
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("Password must contain a letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain a digit");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password("correct horse 1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse 1").unwrap());
        assert!(!verify_password(&hash, "wrong horse 1").unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password 1").unwrap();
        let b = hash_password("same password 1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_stored_hash_is_internal() {
        let result = verify_password("not-a-phc-string", "whatever1");
        assert_eq!(result.unwrap_err(), AuthError::Internal);
    }

    #[test]
    fn test_strength_policy() {
        assert!(validate_password_strength("short1").is_err());
        assert!(validate_password_strength("nodigitshere").is_err());
        assert!(validate_password_strength("12345678901").is_err());
        assert!(validate_password_strength(&"a1".repeat(100)).is_err());
        assert!(validate_password_strength("adequate1").is_ok());
    }

    #[tokio::test]
    async fn test_async_wrappers() {
        let hash = hash_password_async("async pass 1".to_string()).await.unwrap();
        assert!(verify_password_async(hash, "async pass 1".to_string())
            .await
            .unwrap());
    }
}

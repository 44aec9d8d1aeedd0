//! One-way hashing of login secrets.
//!
//! Stored form is an Argon2id PHC string (`$argon2id$v=19$...`) carrying its
//! own salt and parameters.

use std::sync::OnceLock;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::AuthError;

pub fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError {
            code: "ERR_INTERNAL",
            message: "failed to hash secret".to_string(),
        })
}

/// Checks `secret` against a value produced by [`hash_secret`].
///
/// Malformed stored values never verify.
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };

    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// Spends one verification on a fixed hash and always rejects.
///
/// Used when no stored hash exists, so an unknown login costs the same as a
/// wrong secret.
pub fn reject_unknown(secret: &str) -> bool {
    static DUMMY: OnceLock<String> = OnceLock::new();

    let dummy = DUMMY.get_or_init(|| hash_secret("infokeeper-unknown-login").unwrap_or_default());
    let _ = verify_secret(secret, dummy);
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_secret_verifies_only_the_original() {
        let stored = hash_secret("correct horse").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("correct horse"));
        assert!(verify_secret("correct horse", &stored));
        assert!(!verify_secret("correct horse ", &stored));
        assert!(!verify_secret("", &stored));
    }

    #[test]
    fn same_secret_gets_distinct_salts() {
        assert_ne!(hash_secret("pw").unwrap(), hash_secret("pw").unwrap());
    }

    #[test]
    fn malformed_stored_values_never_verify() {
        assert!(!verify_secret("pw", ""));
        assert!(!verify_secret("pw", "pw"));
        assert!(!verify_secret("pw", "sha256$00$00"));
        assert!(!verify_secret("pw", "$argon2id$v=19$garbage"));
    }

    #[test]
    fn unknown_login_never_verifies() {
        assert!(!reject_unknown("infokeeper-unknown-login"));
        assert!(!reject_unknown("anything"));
    }
}

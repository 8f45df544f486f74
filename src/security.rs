use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use once_cell::sync::Lazy;
use password_hash::{PasswordHash, SaltString};

use crate::error::{AppError, AppResult};

// Verified against when a login names an unknown handle, so both failure paths
// pay for one Argon2 verification.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_secret("account-dummy-secret").ok());

/// Hash a secret into an Argon2 PHC string with a fresh 16-byte salt.
pub fn hash_secret(secret: &str) -> AppResult<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| AppError::internal(format!("salt generation failed: {}", e)))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::internal(format!("salt encoding failed: {}", e)))?;
    let phc = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AppError::internal(format!("secret hashing failed: {}", e)))?
        .to_string();
    Ok(phc)
}

/// Constant-time verification of `secret` against a stored PHC hash.
/// An unparsable hash never verifies.
pub fn verify_secret(hash: &str, secret: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(secret.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

/// Burn one verification for a login whose handle does not exist. Always false.
pub fn verify_against_dummy(secret: &str) -> bool {
    if let Some(h) = DUMMY_HASH.as_deref() {
        let _ = verify_secret(h, secret);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let h = hash_secret("correct horse").unwrap();
        assert!(h.starts_with("$argon2"));
        assert!(!h.contains("correct horse"));
        assert!(verify_secret(&h, "correct horse"));
        assert!(!verify_secret(&h, "correct horsf"));
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_secret("same").unwrap(), hash_secret("same").unwrap());
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_secret("plaintext", "plaintext"));
        assert!(!verify_against_dummy("account-dummy-secret"));
    }
}

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Failure hashing a password or parsing a stored hash.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CredentialError::Hash(err.to_string()))
}

/// Check a password against a PHC string produced by [`hash_password`].
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CredentialError> {
    let parsed =
        PasswordHash::new(hash).map_err(|err| CredentialError::MalformedHash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_matching_password() {
        let hash = hash_password("secret1").expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret1", &hash).expect("verify"));
        assert!(!verify_password("secret2", &hash).expect("verify"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = hash_password("secret1").expect("hash");
        let second = hash_password("secret1").expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_reported() {
        match verify_password("secret1", "not-a-phc-string") {
            Err(CredentialError::MalformedHash(_)) => {}
            other => panic!("expected malformed hash error, got {other:?}"),
        }
    }
}

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;
use secrecy::{ExposeSecret, Secret};

/// Hash verified against when the user does not exist, so unknown usernames
/// cost the same as wrong passwords.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| {
    hash_password(&Secret::new(uuid::Uuid::new_v4().to_string())).ok()
});

/// Hash a password with Argon2id and a random salt.
pub fn hash_password(password: &Secret<String>) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(hash)
}

/// Check a password against a stored PHC hash string.
///
/// A malformed hash is an error; a mismatch is `Ok(false)`.
pub fn verify_password(password: &Secret<String>, hash: &str) -> Result<bool, anyhow::Error> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &parsed)
        .is_ok())
}

/// Burn one verification's worth of work.
pub fn verify_dummy(password: &Secret<String>) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> Secret<String> {
        Secret::new(value.to_string())
    }

    #[test]
    fn hash_is_argon2id_phc_string() {
        let hash = hash_password(&secret("correct horse")).unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn verify_accepts_only_the_original_password() {
        let hash = hash_password(&secret("correct horse")).unwrap();
        assert!(verify_password(&secret("correct horse"), &hash).unwrap());
        assert!(!verify_password(&secret("battery staple"), &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let first = hash_password(&secret("correct horse")).unwrap();
        let second = hash_password(&secret("correct horse")).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password(&secret("x"), "not-a-hash").is_err());
    }
}

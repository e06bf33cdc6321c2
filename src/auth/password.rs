use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Salted argon2id hash in PHC string format.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            anyhow::anyhow!("password hashing failed: {e}")
        })
}

/// Checks `plain` against a stored hash. Accounts created through federated
/// sign-in have no hash and never match.
pub fn verify_password(plain: &str, stored: Option<&str>) -> anyhow::Result<bool> {
    let Some(stored) = stored else {
        return Ok(false);
    };
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "stored password hash is malformed");
        anyhow::anyhow!("malformed password hash: {e}")
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

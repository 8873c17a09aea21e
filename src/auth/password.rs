use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

pub const MIN_PASSWORD_LEN: usize = 8;
/// Upper bound in bytes, so a sign-up body cannot make argon2 chew on megabytes.
pub const MAX_PASSWORD_LEN: usize = 1024;

/// Why a password was refused at sign-up or admin bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WeakPassword {
    #[error("Password too short")]
    TooShort,
    #[error("Password too long")]
    TooLong,
}

/// Length policy for new credentials. Length is counted in characters.
pub fn check_strength(plain: &str) -> Result<(), WeakPassword> {
    if plain.len() > MAX_PASSWORD_LEN {
        return Err(WeakPassword::TooLong);
    }
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(WeakPassword::TooShort);
    }
    Ok(())
}

/// Salted argon2id hash in PHC string form, as stored in `users.password_hash`.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            anyhow::anyhow!("password hashing failed: {e}")
        })
}

/// `Ok(false)` means wrong password; `Err` means the stored credential is corrupt.
pub fn verify_password(plain: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!(error = %e, "stored password hash is unreadable");
        anyhow::anyhow!("stored password hash is unreadable: {e}")
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

//! Password hashing and verification using Argon2id.
//!
//! Hashes are PHC strings with a random per-hash salt, so no separate salt
//! storage is needed. Pure functions, no shared state.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a plaintext password.
///
/// # Errors
///
/// Returns an error if hashing fails, which with the default parameters
/// indicates an environment problem rather than bad input.
pub fn hash(plaintext: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default().hash_password(plaintext.as_bytes(), &salt)?;

    Ok(hash.to_string())
}

/// Verify a plaintext password against a PHC-formatted hash.
///
/// Returns `false` on mismatch or on malformed hash input, never an error.
#[must_use]
pub fn verify(plaintext: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

//! Password hashing and verification.
//!
//! Hashing uses Argon2id with default parameters and a random salt from
//! `OsRng`, stored as a PHC string. The async wrappers move the work onto the
//! blocking pool so request tasks are not stalled.
//!
//! # Example
//!
//! ```ignore
//! use postly_auth::password::{hash_password, verify_password};
//!
//! let hash = hash_password("hunter22".to_string()).await?;
//! assert!(verify_password("hunter22".to_string(), hash).await?);
//! ```

use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

use crate::AuthResult;
use crate::error::AuthError;

/// Hashes `password` with Argon2id.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
pub fn hash_password_blocking(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verifies `password` against a PHC hash.
///
/// Returns `Ok(false)` on mismatch. Errs only if the hash does not parse.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` for a malformed hash.
pub fn verify_password_blocking(
    password: &str,
    hash: &str,
) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Hashes `password` on the blocking pool.
///
/// # Errors
///
/// Returns `ServerError` if hashing fails or the blocking task panics.
pub async fn hash_password(password: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| AuthError::server_error(format!("hashing task failed: {e}")))?
        .map_err(|e| AuthError::server_error(format!("password hashing failed: {e}")))
}

/// Verifies `password` against `hash` on the blocking pool.
///
/// A malformed stored hash counts as a mismatch.
///
/// # Errors
///
/// Returns `ServerError` if the blocking task panics.
pub async fn verify_password(password: String, hash: String) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || {
        verify_password_blocking(&password, &hash).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        })
    })
    .await
    .map_err(|e| AuthError::server_error(format!("verification task failed: {e}")))
}

/// Burns the same Argon2 work as a real verification and always fails.
///
/// Used when the email is unknown, so that path costs as much as a wrong
/// password.
///
/// The dummy hash is built lazily on the blocking pool, never on a runtime
/// thread.
pub async fn verify_against_dummy(password: String) -> AuthResult<()> {
    tokio::task::spawn_blocking(move || {
        if let Some(hash) = dummy_hash() {
            let _ = verify_password_blocking(&password, hash);
        }
    })
    .await
    .map_err(|e| AuthError::server_error(format!("verification task failed: {e}")))
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    DUMMY_HASH
        .get_or_init(|| hash_password_blocking(&generate_random_secret()).ok())
        .as_deref()
}

/// Generates a 256-bit random secret, hex encoded.
///
/// Federated accounts get the hash of one of these as their credential, so
/// they satisfy the credential-required invariant without a usable password.
#[must_use]
pub fn generate_random_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_CHARS: usize = 6;

/// How new password hashes are produced. Verification accepts either format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    /// Unsalted SHA-256 hex digest. Compatible with existing data but weak
    /// against precomputed tables.
    #[default]
    Sha256,
    Bcrypt,
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::validation(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_CHARS),
        ));
    }
    Ok(())
}

pub fn hash_password(scheme: PasswordScheme, password: &str) -> AppResult<String> {
    match scheme {
        PasswordScheme::Sha256 => Ok(sha256_hex(password)),
        PasswordScheme::Bcrypt => Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?),
    }
}

/// Check `password` against a stored hash of either scheme.
pub fn verify_password(password: &str, stored: &str) -> bool {
    if stored.starts_with("$2") {
        return bcrypt::verify(password, stored).unwrap_or(false);
    }
    constant_time_eq(sha256_hex(password).as_bytes(), stored.as_bytes())
}

fn sha256_hex(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len_match = a.len() == b.len();
    let max_len = a.len().max(b.len());

    let mut result = 0u8;
    for i in 0..max_len {
        let byte_a = a.get(i).copied().unwrap_or(0);
        let byte_b = b.get(i).copied().unwrap_or(0);
        result |= byte_a ^ byte_b;
    }

    len_match && result == 0
}

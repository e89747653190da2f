//! Internal helpers for input normalization and error translation.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::{OsRng, RngCore},
    },
};
use base64::Engine as _;
use sea_orm::{DbErr, SqlErr};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, workspaces::DEFAULT_CURRENCY};

/// Lookup form of an email address: trimmed and lowercased.
pub(crate) fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Minimal shape check; delivery is not the engine's concern.
pub(crate) fn validate_email(email: &str) -> ResultEngine<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(EngineError::Validation(format!(
            "invalid email: \"{email}\""
        ))),
    }
}

/// Blank falls back to [`DEFAULT_CURRENCY`]; anything else must be three
/// ASCII letters and is stored uppercased.
pub(crate) fn normalize_currency(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_CURRENCY.to_string());
    }
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(EngineError::Validation(format!(
            "invalid currency: \"{trimmed}\" (expected a 3-letter code)"
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Parse a UUID from user input and return a labeled error on failure.
pub fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub(crate) fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}

pub(crate) fn hash_password(password: &str) -> ResultEngine<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| EngineError::Internal(format!("hash password: {err}")))
}

pub(crate) fn verify_password(password: &str, hash: &str) -> ResultEngine<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| EngineError::Internal(format!("parse password hash: {err}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Opaque refresh token: 32 random bytes, URL-safe base64 without padding.
pub(crate) fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Lookup key stored in place of the token itself.
pub(crate) fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_defaults_and_uppercases() {
        assert_eq!(normalize_currency("  ").unwrap(), "UAH");
        assert_eq!(normalize_currency(" eur ").unwrap(), "EUR");
        assert!(normalize_currency("EURO").is_err());
        assert!(normalize_currency("E1R").is_err());
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn refresh_tokens_are_unique_and_hash_stably() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert_eq!(hash_refresh_token(&a), hash_refresh_token(&a));
        assert_ne!(hash_refresh_token(&a), hash_refresh_token(&b));
        assert_eq!(hash_refresh_token(&a).len(), 64);
    }

    #[test]
    fn uuid_errors_are_labeled() {
        assert_eq!(
            parse_uuid("nope", "workspace"),
            Err(EngineError::InvalidId("invalid workspace id".to_string()))
        );
    }
}

//! Staff bearer-token authentication
//!
//! Tokens are opaque random strings handed to a staff member once, when the
//! account is created. Only the SHA-256 digest is stored, so a leaked database
//! does not leak usable tokens.
//!
//! This module contains only pure functions and the database lookup. HTTP
//! extraction lives in the service crate.

use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::{Role, Staff};

/// Authentication / authorization failures
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header on the request
    #[error("Missing Authorization header")]
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    #[error("Malformed Authorization header")]
    MalformedCredentials,

    /// Token unknown or staff member deactivated
    #[error("Invalid or revoked token")]
    InvalidToken,

    /// Authenticated, but role not allowed for the operation
    #[error("Role '{role}' is not permitted to perform this operation")]
    Forbidden { role: Role },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Generate a fresh bearer token (32 random bytes, hex encoded)
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}

/// SHA-256 digest of a token, hex encoded
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Extract the token from an `Authorization` header value
///
/// # Examples
///
/// ```
/// use ysr_common::auth::parse_bearer;
///
/// assert_eq!(parse_bearer("Bearer abc123").unwrap(), "abc123");
/// assert!(parse_bearer("Basic abc123").is_err());
/// ```
pub fn parse_bearer(header_value: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header_value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedCredentials)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedCredentials);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedCredentials);
    }
    Ok(token)
}

/// Resolve a bearer token to an active staff member
pub async fn authenticate(pool: &SqlitePool, token: &str) -> Result<Staff, AuthError> {
    let token_hash = hash_token(token);
    match crate::db::staff::find_active_by_token_hash(pool, &token_hash).await {
        Ok(Some(staff)) => Ok(staff),
        Ok(None) => Err(AuthError::InvalidToken),
        Err(crate::Error::Database(e)) => Err(AuthError::Database(e)),
        Err(e) => {
            tracing::error!(error = %e, "Stored staff row could not be decoded");
            Err(AuthError::InvalidToken)
        }
    }
}

/// Require an elevated role (admin or manager)
pub fn require_elevated(staff: &Staff) -> Result<(), AuthError> {
    if staff.role.is_elevated() {
        Ok(())
    } else {
        Err(AuthError::Forbidden { role: staff.role })
    }
}

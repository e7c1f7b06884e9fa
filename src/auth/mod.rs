//! Session authentication for local users.
//!
//! Login issues a JWT (see [`JwtKeys`]); clients send it back as
//! `Authorization: Bearer <jwt>` on every protected request.

mod jwt;

pub use jwt::{Claims, JwtError, JwtKeys};

use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;


/// Why a request carries no usable session credential.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("no session token supplied")]
    Absent,
    #[error("Authorization header is not a bearer credential")]
    NotBearer,
}

/// Borrows the session token from the `Authorization` header.
///
/// The scheme is matched case-insensitively and surrounding whitespace is
/// ignored. `Bearer` with nothing after it counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, CredentialsError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(CredentialsError::Absent)?
        .to_str()
        .map_err(|_| CredentialsError::NotBearer)?
        .trim();

    let (scheme, token) = value
        .split_once(char::is_whitespace)
        .unwrap_or((value, ""));

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(CredentialsError::NotBearer);
    }

    match token.trim() {
        "" => Err(CredentialsError::Absent),
        token => Ok(token),
    }
}

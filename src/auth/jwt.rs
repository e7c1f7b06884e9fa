//! Session tokens for local user accounts.
//!
//! HS256 JWTs whose subject is the user's email address.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User email
    pub sub: String,
    /// Expiry, unix epoch seconds
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("failed to sign token: {0}")]
    Encode(jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, lifetime_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::minutes(lifetime_minutes),
        }
    }

    /// Issues a token for `email` valid for the configured lifetime.
    pub fn issue(&self, email: &str) -> Result<String, JwtError> {
        self.issue_with_lifetime(email, self.lifetime)
    }

    fn issue_with_lifetime(&self, email: &str, lifetime: Duration) -> Result<String, JwtError> {
        let claims = Claims {
            sub: email.to_string(),
            exp: (Utc::now() + lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(JwtError::Encode)
    }

    /// Validates signature and expiry and returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::Invalid)
    }
}

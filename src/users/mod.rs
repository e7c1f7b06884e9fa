//! Local user accounts.
//!
//! Users sign up with an email, a username and a password; the password is
//! stored only as a salted PBKDF2 hash. Successful logins receive a JWT (see
//! [`crate::auth::JwtKeys`]) that gates the chat endpoints.

pub mod password;
mod store;

pub use password::{hash_password, verify_password};
pub use store::{UserStore, UserStoreError};

use serde::Serialize;

/// A stored user account.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    /// UUID v7
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    /// RFC 3339
    pub created_at: String,
}

/// Public view of a user (no password hash).
#[derive(Clone, Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub username: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }
}

/// Minimal `local@domain.tld` shape check. Every domain label must be non-empty.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain
            .split('.')
            .all(|label| !label.is_empty() && !label.contains('@'))
}

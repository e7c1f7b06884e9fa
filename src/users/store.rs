//! User account storage using SQLite.

use super::User;
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("Email already registered")]
    EmailTaken,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("user store lock poisoned")]
    Poisoned,
}

/// User accounts backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE users (
///     id TEXT PRIMARY KEY,             -- UUID v7
///     email TEXT NOT NULL UNIQUE,
///     username TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,     -- base64(salt):base64(hash)
///     created_at TEXT NOT NULL         -- ISO 8601 timestamp
/// );
/// ```
pub struct UserStore {
    conn: Mutex<Connection>,
}

impl UserStore {
    /// Creates or opens a user store. `":memory:"` gives a throwaway store.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, UserStoreError> {
        let conn = Connection::open(db_path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, UserStoreError> {
        self.conn.lock().map_err(|_| UserStoreError::Poisoned)
    }

    /// Inserts a new user. Email is checked for uniqueness before username.
    pub fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User, UserStoreError> {
        if self.find_by_email(email)?.is_some() {
            return Err(UserStoreError::EmailTaken);
        }
        if self.find_by_username(username)?.is_some() {
            return Err(UserStoreError::UsernameTaken);
        }

        let user = User {
            id: Uuid::now_v7().to_string(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        let result = self.conn()?.execute(
            r#"
            INSERT INTO users (id, email, username, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                user.id,
                user.email,
                user.username,
                user.password_hash,
                user.created_at
            ],
        );

        match result {
            Ok(_) => Ok(user),
            // Lost a race with a concurrent signup
            Err(rusqlite::Error::SqliteFailure(e, Some(msg)))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                if msg.contains("users.email") {
                    Err(UserStoreError::EmailTaken)
                } else {
                    Err(UserStoreError::UsernameTaken)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        self.find_by("email", email)
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError> {
        self.find_by("username", username)
    }

    fn find_by(&self, column: &'static str, value: &str) -> Result<Option<User>, UserStoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, email, username, password_hash, created_at FROM users WHERE {} = ?1",
            column
        );
        let user = conn
            .query_row(&sql, params![value], |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    username: row.get(2)?,
                    password_hash: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .optional()?;
        Ok(user)
    }
}

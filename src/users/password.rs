//! Password hashing with PBKDF2-HMAC-SHA256 (ring).
//!
//! Hashes are stored as `base64(salt):base64(hash)`.

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const ITERATIONS: u32 = 100_000;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

fn iterations() -> NonZeroU32 {
    NonZeroU32::new(ITERATIONS).unwrap_or(NonZeroU32::MIN)
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| anyhow!("Failed to generate password salt"))?;

    let mut hash = [0u8; KEY_LEN];
    pbkdf2::derive(PBKDF2_ALG, iterations(), &salt, password.as_bytes(), &mut hash);

    Ok(format!("{}:{}", BASE64.encode(salt), BASE64.encode(hash)))
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, hash)) = stored.split_once(':') else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (BASE64.decode(salt), BASE64.decode(hash)) else {
        return false;
    };

    pbkdf2::verify(PBKDF2_ALG, iterations(), &salt, password.as_bytes(), &hash).is_ok()
}

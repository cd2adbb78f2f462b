//! Password digests
//!
//! Stored form is `<salt hex>$<hmac hex>` where the HMAC-SHA256 key is the
//! random salt and the message is the password.
//!
//! A single HMAC round is fast, so this is not a password KDF. It is only
//! suitable for the in-memory accounts seeded from configuration; a
//! persistent user store needs a slow hash such as argon2 instead.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::AuthError;

type HmacSha256 = Hmac<Sha256>;

const SALT_LEN: usize = 16;

fn keyed(salt: &[u8]) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(salt).map_err(|e| AuthError::Key(e.to_string()))
}

/// Digest a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut mac = keyed(&salt)?;
    mac.update(password.as_bytes());
    Ok(format!(
        "{}${}",
        hex::encode(salt),
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check a password against a stored digest in constant time.
/// Malformed digests never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(digest)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };
    let Ok(mut mac) = keyed(&salt) else {
        return false;
    };
    mac.update(password.as_bytes());
    mac.verify_slice(&digest).is_ok()
}

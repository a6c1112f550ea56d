//! Salted credential hashing and verification.
//!
//! Stored credentials have the form `salt:digest`, where `salt` is a fresh
//! random alphanumeric string of [`SALT_LENGTH`] characters and `digest` is
//! the lowercase hex SHA-256 of `plain + salt`.
//!
//! Both functions are pure apart from drawing the salt and are safe to call
//! from any number of threads.
//!
//! # Examples
//!
//! ```
//! use shelfkeep_core::credential::{hash_credential, verify_credential};
//!
//! let stored = hash_credential("secret1");
//! assert!(verify_credential("secret1", &stored));
//! assert!(!verify_credential("wrong", &stored));
//! ```

use crate::constants::{SALT_LENGTH, SALT_SEPARATOR};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Generate a random alphanumeric salt of [`SALT_LENGTH`] characters.
pub fn generate_salt() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}

/// Hex digest of `plain + salt`.
fn digest_with_salt(plain: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plain.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash a plain-text credential with a freshly generated salt.
///
/// Two calls with the same input produce different stored values.
pub fn hash_credential(plain: &str) -> String {
    let salt = generate_salt();
    let digest = digest_with_salt(plain, &salt);
    format!("{salt}{SALT_SEPARATOR}{digest}")
}

/// Check a plain-text credential against a stored `salt:digest` value.
///
/// Returns `false` for malformed stored values instead of failing.
///
/// # Security
///
/// The digest comparison runs in constant time via the `subtle` crate so
/// the position of the first differing byte is not observable.
pub fn verify_credential(plain: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split(SALT_SEPARATOR).collect();
    let [salt, stored_digest] = parts.as_slice() else {
        return false;
    };

    let computed = digest_with_salt(plain, salt);
    computed.as_bytes().ct_eq(stored_digest.as_bytes()).into()
}

//! Credential store - salted PBKDF2 password hashing.
//!
//! A stored credential is one ASCII string: a 64-character hex salt (the SHA-256 of 60 random
//! bytes) followed by the hex PBKDF2-HMAC-SHA512 digest of the password, using the salt's
//! ASCII text as the PBKDF2 salt. Existing data files depend on this exact layout.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};

/// PBKDF2 rounds.
pub const ITERATIONS: u32 = 100_000;
/// Length of the hex salt prefix.
pub const SALT_LEN: usize = 64;
const DIGEST_LEN: usize = 64;

/// Hashes `password` under a fresh random salt.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let mut seed = [0u8; 60];
    rand::rng().fill_bytes(&mut seed);
    let salt = hex::encode(Sha256::digest(seed));

    let mut stored = salt.clone();
    stored.push_str(&derive(password, &salt));
    stored
}

/// Checks `password` against a stored credential.
///
/// Empty or truncated credentials never verify.
#[must_use]
pub fn verify_password(stored: &str, password: &str) -> bool {
    if stored.len() <= SALT_LEN || !stored.is_char_boundary(SALT_LEN) {
        return false;
    }
    let (salt, expected) = stored.split_at(SALT_LEN);
    derive(password, salt) == expected
}

fn derive(password: &str, salt: &str) -> String {
    let mut digest = [0u8; DIGEST_LEN];
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), ITERATIONS, &mut digest);
    hex::encode(digest)
}

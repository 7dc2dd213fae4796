//! Opaque secret generation and one-way digests
//!
//! Every secret handed to a client (session token, trusted-device cookie,
//! reset token) is 32 CSPRNG bytes rendered as hex; the stores only ever
//! see the SHA-256 digest. Comparison is constant-time.

use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Raw secret length in bytes (256 bits of entropy, 64 hex chars)
const SECRET_BYTES: usize = 32;

/// Generate a new opaque secret as lowercase hex
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a 6-digit one-time code, zero-padded
pub fn generate_otp_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

/// One-way digest used as the storage key for a secret
pub fn hash_secret(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time equality over two digests
pub fn digests_match(a: &str, b: &str) -> bool {
    // ct_eq on unequal lengths short-circuits, but digests are fixed-width
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Hash a presented secret and compare against a stored digest
pub fn verify_secret(raw: &str, stored_digest: &str) -> bool {
    digests_match(&hash_secret(raw), stored_digest)
}

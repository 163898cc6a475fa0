//! # Payload Integrity
//!
//! Clients send the SHA-256 of the base64 *text* alongside the image. The
//! server recomputes it over the same text before decoding anything.
//!
//! This catches accidental corruption only: there is no shared secret and the
//! comparison is a plain string equality, so it authenticates nothing.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the UTF-8 bytes of `encoded`.
pub fn compute_image_hash(encoded: &str) -> String {
    hex::encode(Sha256::digest(encoded.as_bytes()))
}

/// Check `provided_hash` against the digest of the encoded payload.
///
/// The comparison is case-sensitive: an uppercase digest does not match.
pub fn verify_image_hash(encoded: &str, provided_hash: &str) -> bool {
    compute_image_hash(encoded) == provided_hash
}

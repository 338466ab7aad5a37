//! Identifier helpers.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Derives a stable identifier for an indexed artifact from its content.
///
/// The identifier is the first 16 bytes of the SHA-256 digest, hex encoded,
/// so the same draft always maps to the same index entry.
#[must_use]
pub fn artifact_fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    format!("artifact:{}", hex::encode(&digest[..16]))
}

//! SHA-256 content digests for compiled documents.

use sha2::{Digest, Sha256};

/// Lowercase hex-encoded SHA-256 of `content`.
pub fn content_digest(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    format!("{:x}", digest)
}

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

/// Deterministic fingerprint for an uploaded image. The same photo always
/// maps to the same cache entry regardless of surrounding request fields.
pub fn image_fingerprint(data_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data_url.trim().as_bytes());
    let digest = hasher.finalize();
    STANDARD_NO_PAD.encode(digest)
}

/// Fingerprint for an arbitrary request payload, scoped by operation so
/// different endpoints never collide on identical bodies.
pub fn payload_fingerprint(operation: &str, payload: &JsonValue) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(b"\x00");

    if let Ok(serialized) = serde_json::to_vec(payload) {
        hasher.update(&serialized);
    }

    let digest = hasher.finalize();
    STANDARD_NO_PAD.encode(digest)
}

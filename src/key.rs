use sha2::{Digest, Sha256};

/// Derives the cache key for a URI: SHA-256 over the raw bytes, hex encoded.
///
/// Hex rather than base64 so two keys never collide on a case-insensitive
/// filesystem. Any string produces a key; URI syntax is not checked here.
pub fn derive(uri: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uri.as_bytes());
    hex::encode(hasher.finalize())
}

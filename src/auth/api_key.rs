//! API key hashing and generation
//!
//! Keys are opaque strings stored only as SHA-256 digests. The digest is
//! deterministic and unsalted so a presented key can be resolved with a
//! single equality lookup on the stored hash.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Hash an API key to its stored form (lowercase hex, 64 chars)
pub fn digest_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new API key
///
/// Returns the plaintext key (shown only once) and its digest.
pub fn generate_api_key() -> (String, String) {
    let key = Uuid::new_v4().to_string();
    let digest = digest_api_key(&key);
    (key, digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let a = digest_api_key("my-secret-key");
        let b = digest_api_key("my-secret-key");
        assert_eq!(a, b);
    }

    #[test]
    fn test_digest_is_hex_and_fixed_length() {
        let d = digest_api_key("anything");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_distinct_keys_have_distinct_digests() {
        assert_ne!(digest_api_key("key-one"), digest_api_key("key-two"));
        assert_ne!(digest_api_key(""), digest_api_key(" "));
    }

    #[test]
    fn test_generated_key_matches_its_digest() {
        let (key, digest) = generate_api_key();
        assert_eq!(digest_api_key(&key), digest);

        let (other, _) = generate_api_key();
        assert_ne!(key, other);
    }
}

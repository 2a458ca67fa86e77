//! Revoked token registry
//!
//! In-memory set of revoked token identifiers with concurrent access.
//! Entries live for the lifetime of the process; tokens expire on their own
//! shortly after, so the set stays small relative to traffic.

use dashmap::DashSet;

/// Tracks `jti` values of revoked access tokens
#[derive(Debug, Default)]
pub struct RevocationRegistry {
    revoked: DashSet<String>,
}

impl RevocationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            revoked: DashSet::new(),
        }
    }

    /// Mark a token identifier as revoked (idempotent)
    pub fn mark_revoked(&self, jti: &str) {
        self.revoked.insert(jti.to_string());
    }

    /// Check whether a token identifier has been revoked
    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.contains(jti)
    }

    /// Number of revoked identifiers held
    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_mark_and_check() {
        let registry = RevocationRegistry::new();
        assert!(!registry.is_revoked("token-1"));

        registry.mark_revoked("token-1");
        assert!(registry.is_revoked("token-1"));
        assert!(!registry.is_revoked("token-2"));
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let registry = RevocationRegistry::new();
        registry.mark_revoked("token-1");
        registry.mark_revoked("token-1");
        registry.mark_revoked("token-1");

        assert!(registry.is_revoked("token-1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_revokes_converge() {
        let registry = Arc::new(RevocationRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        registry.mark_revoked(&format!("jti-{i}"));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 100);
        assert!(registry.is_revoked("jti-0"));
        assert!(registry.is_revoked("jti-99"));
    }
}

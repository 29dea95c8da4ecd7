//! Password hashing

use crate::error::{Error, Result};
use std::fmt;

/// bcrypt work factor used when none is configured
pub const DEFAULT_COST: u32 = 10;

/// A stored bcrypt hash (`$2b$<cost>$<salt><digest>`)
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a hash loaded from storage
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Hash a plaintext password with a fresh random salt
pub fn hash_password(plaintext: &str, cost: u32) -> Result<PasswordHash> {
    Ok(PasswordHash(bcrypt::hash(plaintext, cost)?))
}

/// Check a plaintext password against a stored hash.
///
/// A stored hash that cannot be parsed counts as a mismatch.
pub fn verify_password(plaintext: &str, stored: &PasswordHash) -> bool {
    match bcrypt::verify(plaintext, stored.as_str()) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            false
        }
    }
}

/// Hasher bound to a configured cost factor
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, plaintext: &str) -> Result<PasswordHash> {
        hash_password(plaintext, self.cost)
    }

    pub fn verify(&self, plaintext: &str, stored: &PasswordHash) -> bool {
        verify_password(plaintext, stored)
    }

    /// [`hash`](Self::hash) on the blocking pool, keeping bcrypt off the async workers
    pub async fn hash_blocking(&self, plaintext: &str) -> Result<PasswordHash> {
        let (cost, plaintext) = (self.cost, plaintext.to_owned());
        tokio::task::spawn_blocking(move || hash_password(&plaintext, cost))
            .await
            .map_err(|e| Error::Other(format!("password hashing task failed: {}", e)))?
    }

    /// [`verify`](Self::verify) on the blocking pool
    pub async fn verify_blocking(&self, plaintext: &str, stored: &PasswordHash) -> Result<bool> {
        let (plaintext, stored) = (plaintext.to_owned(), stored.clone());
        tokio::task::spawn_blocking(move || verify_password(&plaintext, &stored))
            .await
            .map_err(|e| Error::Other(format!("password verification task failed: {}", e)))
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // bcrypt's minimum cost keeps the tests quick
    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("longenough1", TEST_COST).unwrap();
        assert!(verify_password("longenough1", &hash));
        assert!(!verify_password("longenough2", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let first = hash_password("same-password", TEST_COST).unwrap();
        let second = hash_password("same-password", TEST_COST).unwrap();
        assert_ne!(first, second);
        assert!(verify_password("same-password", &first));
        assert!(verify_password("same-password", &second));
    }

    #[test]
    fn test_hash_is_self_describing() {
        let hash = hash_password("secret-pass", TEST_COST).unwrap();
        assert!(hash.as_str().starts_with("$2"));
        assert!(hash.as_str().contains("$04$"));
        assert!(!hash.as_str().contains("secret-pass"));
    }

    #[test]
    fn test_corrupt_hash_fails_closed() {
        let corrupt = PasswordHash::from_stored("not-a-bcrypt-hash");
        assert!(!verify_password("anything", &corrupt));

        let empty = PasswordHash::from_stored("");
        assert!(!verify_password("", &empty));
    }

    #[tokio::test]
    async fn test_blocking_pool_variants_agree() {
        let hasher = CredentialHasher::new(TEST_COST);
        let hash = hasher.hash_blocking("pool-password").await.unwrap();
        assert!(verify_password("pool-password", &hash));
        assert!(hasher.verify_blocking("pool-password", &hash).await.unwrap());
        assert!(!hasher.verify_blocking("other-password", &hash).await.unwrap());

        let corrupt = PasswordHash::from_stored("not-a-bcrypt-hash");
        assert!(!hasher.verify_blocking("anything", &corrupt).await.unwrap());
    }

    #[test]
    fn test_debug_does_not_leak_hash() {
        let hash = hash_password("secret-pass", TEST_COST).unwrap();
        assert_eq!(format!("{:?}", hash), "PasswordHash(..)");
    }
}

/// Password Hashing and Verification
///
/// bcrypt with a configurable work factor. Hashes embed the algorithm tag,
/// cost and salt, so verification needs nothing but the stored string.

use std::fmt;

use bcrypt::{hash, verify};

/// bcrypt ignores everything past this many bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("password is empty")]
    EmptyInput,
    #[error("password is longer than {0} bytes")]
    TooLong(usize),
    #[error("password does not match")]
    Mismatch,
    #[error("bcrypt failure: {0}")]
    Hashing(String),
}

/// An opaque, algorithm-tagged password hash.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a hash read back from storage.
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

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub const MIN_COST: u32 = 4;
    pub const MAX_COST: u32 = 31;

    /// # Errors
    /// Returns `Hashing` if `cost` is outside what bcrypt accepts.
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        if !(Self::MIN_COST..=Self::MAX_COST).contains(&cost) {
            return Err(PasswordError::Hashing(format!("invalid bcrypt cost {}", cost)));
        }
        Ok(Self { cost })
    }

    /// Hash a password
    ///
    /// # Errors
    /// - `EmptyInput` for an empty password
    /// - `TooLong` past 72 bytes
    /// - `Hashing` if bcrypt itself fails
    pub fn hash(&self, password: &str) -> Result<PasswordHash, PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::EmptyInput);
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong(MAX_PASSWORD_BYTES));
        }

        hash(password, self.cost)
            .map(PasswordHash)
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Verify a password against a stored hash
    ///
    /// # Errors
    /// - `Mismatch` when the password is wrong
    /// - `Hashing` when the stored hash cannot be parsed
    pub fn verify(&self, password: &str, hash: &PasswordHash) -> Result<(), PasswordError> {
        match verify(password, hash.as_str()) {
            Ok(true) => Ok(()),
            Ok(false) => Err(PasswordError::Mismatch),
            Err(e) => Err(PasswordError::Hashing(e.to_string())),
        }
    }

    /// `hash` on the blocking thread pool.
    pub async fn hash_blocking(&self, password: String) -> Result<PasswordHash, PasswordError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| PasswordError::Hashing(format!("hashing task failed: {}", e)))?
    }

    /// `verify` on the blocking thread pool.
    pub async fn verify_blocking(
        &self,
        password: String,
        hash: PasswordHash,
    ) -> Result<(), PasswordError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| PasswordError::Hashing(format!("verification task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(PasswordHasher::MIN_COST).expect("valid cost")
    }

    #[test]
    fn test_hash_password() {
        let password = "weakPassword";
        let hash = hasher().hash(password).expect("Failed to hash password");

        assert_ne!(password, hash.as_str());
        assert!(hash.as_str().starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let hasher = hasher();
        for password in ["weakPassword", "Strong32Passw264!-=d", "!-v4i!>AFefa86=!31*}"] {
            let hash = hasher.hash(password).expect("Failed to hash password");
            assert_eq!(hasher.verify(password, &hash), Ok(()));
        }
    }

    #[test]
    fn test_verify_wrong_password() {
        let hasher = hasher();
        let hash = hasher.hash("correct-pw").expect("Failed to hash password");

        assert_eq!(hasher.verify("wrong-pw", &hash), Err(PasswordError::Mismatch));
    }

    #[test]
    fn test_same_password_gets_different_salt() {
        let hasher = hasher();
        let first = hasher.hash("correct-pw").unwrap();
        let second = hasher.hash("correct-pw").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_empty_password() {
        assert_eq!(hasher().hash(""), Err(PasswordError::EmptyInput));
    }

    #[test]
    fn test_too_long_password() {
        let long_password = "a".repeat(MAX_PASSWORD_BYTES + 1);
        assert_eq!(
            hasher().hash(&long_password),
            Err(PasswordError::TooLong(MAX_PASSWORD_BYTES))
        );
    }

    #[test]
    fn test_malformed_hash_is_not_a_mismatch() {
        let result = hasher().verify("correct-pw", &PasswordHash::from_stored("not-a-hash"));
        assert!(matches!(result, Err(PasswordError::Hashing(_))));
    }

    #[test]
    fn test_invalid_cost() {
        assert!(PasswordHasher::new(3).is_err());
        assert!(PasswordHasher::new(32).is_err());
        let hash = PasswordHasher::new(5).unwrap().hash("correct-pw").unwrap();
        assert!(hash.as_str().starts_with("$2b$05$"));
    }

    #[test]
    fn test_debug_does_not_leak_hash() {
        let hash = hasher().hash("correct-pw").unwrap();
        assert_eq!(format!("{:?}", hash), "PasswordHash(..)");
    }

    #[tokio::test]
    async fn test_blocking_round_trip() {
        let hasher = hasher();
        let hash = hasher.hash_blocking("correct-pw".to_string()).await.unwrap();

        assert!(hasher.verify_blocking("correct-pw".to_string(), hash.clone()).await.is_ok());
        assert_eq!(
            hasher.verify_blocking("wrong-pw".to_string(), hash).await,
            Err(PasswordError::Mismatch)
        );
    }
}

//! Port for password hashing.

/// Hash and salt produced for a password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    pub hash: String,
    pub salt: String,
}

/// Password hashing collaborator.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Hash `password` with a fresh salt.
    fn create_hash(&self, password: &str) -> PasswordDigest;

    /// Whether `password` produces `hash` under `salt`.
    fn verify(&self, password: &str, hash: &str, salt: &str) -> bool;
}

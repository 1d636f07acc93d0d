//! Salted SHA-256 password hashing.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::domain::ports::{PasswordDigest, PasswordHasher};

const SALT_BYTES: usize = 16;

type Digest256 = [u8; 32];

/// [`PasswordHasher`] producing hex `sha256(salt || password)` digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256PasswordHasher;

impl Sha256PasswordHasher {
    fn digest(password: &str, salt: &str) -> Digest256 {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        hasher.finalize().into()
    }

    fn decode_stored(hash: &str) -> Option<Digest256> {
        let bytes = hex::decode(hash).ok()?;
        Digest256::try_from(bytes.as_slice()).ok()
    }
}

impl PasswordHasher for Sha256PasswordHasher {
    fn create_hash(&self, password: &str) -> PasswordDigest {
        let mut salt = [0_u8; SALT_BYTES];
        rand::thread_rng().fill(&mut salt);
        let salt = hex::encode(salt);
        PasswordDigest {
            hash: hex::encode(Self::digest(password, &salt)),
            salt,
        }
    }

    fn verify(&self, password: &str, hash: &str, salt: &str) -> bool {
        let Some(stored) = Self::decode_stored(hash) else {
            return false;
        };
        Self::digest(password, salt).ct_eq(&stored).into()
    }
}

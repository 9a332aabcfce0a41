use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use tracing::warn;

use crate::config::HashingConfig;
use crate::error::HashingError;

/// Argon2id hashing with a random salt per call. Hashes are PHC strings, so
/// they carry their own parameters and salt.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(config: &HashingConfig) -> Result<Self, HashingError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| HashingError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash_blocking(&self, plaintext: &str) -> Result<String, HashingError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashingError::Hash(e.to_string()))
    }

    /// `false` for a wrong password and for a hash that cannot be parsed or
    /// checked.
    pub fn verify_blocking(&self, plaintext: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is unreadable: {}", e);
                return false;
            }
        };

        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                warn!("Password verification failed: {}", e);
                false
            }
        }
    }

    /// Hashes on the blocking pool so a slow work factor does not stall the
    /// runtime.
    pub async fn hash(&self, plaintext: &str) -> Result<String, HashingError> {
        let hasher = self.clone();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&plaintext))
            .await
            .map_err(|e| HashingError::Hash(e.to_string()))?
    }

    pub async fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let hasher = self.clone();
        let plaintext = plaintext.to_string();
        let hash = hash.to_string();
        match tokio::task::spawn_blocking(move || hasher.verify_blocking(&plaintext, &hash)).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Password verification task failed: {}", e);
                false
            }
        }
    }
}

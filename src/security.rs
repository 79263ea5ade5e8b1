//! Credential hashing and verification (Argon2id, PHC strings).

use anyhow::{anyhow, Result};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use once_cell::sync::OnceCell;
use password_hash::{PasswordHash, SaltString};

use crate::config::PasswordConfig;

/// Hashes and verifies passwords with process-wide cost parameters.
#[derive(Clone)]
pub struct CredentialManager {
    argon2: Argon2<'static>,
    /// Hash used to equalise timing when no stored hash exists; built on first use.
    decoy: OnceCell<String>,
}

impl CredentialManager {
    pub fn new(cfg: &PasswordConfig) -> Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow!("invalid argon2 parameters: {e}"))?;
        Ok(Self { argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params), decoy: OnceCell::new() })
    }

    /// Hash a plaintext password. A fresh random salt is embedded in every result.
    pub fn hash(&self, password: &str) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
        let phc = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!(e.to_string()))?
            .to_string();
        Ok(phc)
    }

    /// True only if `password` matches `hash`. Undecodable or foreign hashes fail closed.
    pub fn verify(&self, hash: &str, password: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self.argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }

    /// Spend roughly one verification worth of work and report failure.
    pub fn dummy_verify(&self, password: &str) -> bool {
        let decoy = self.decoy.get_or_try_init(|| self.hash("decoy-password-never-matches"));
        match decoy {
            Ok(hash) => {
                let _ = self.verify(hash, password);
            }
            Err(e) => tracing::warn!(target: "teller::auth", "decoy hash unavailable: {e}"),
        }
        false
    }
}

#[cfg(test)]
pub(crate) fn test_credentials() -> CredentialManager {
    // Minimal cost so unit tests stay fast
    let cfg = PasswordConfig { memory_kib: 64, iterations: 1, parallelism: 1 };
    CredentialManager::new(&cfg).expect("argon2 params")
}

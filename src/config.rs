//! Process configuration.
//!
//! `AppConfig` is built once at startup from defaults, then environment variables, then
//! command-line flags (see `main.rs`), validated, and shared read-only afterwards. The
//! token secret in particular is never re-read from the environment after this point.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TELLER_JWT_SECRET is not set")]
    MissingSecret,
    #[error("token secret must be at least 32 bytes")]
    WeakSecret,
    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Session token settings.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_secs: i64,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

/// Argon2id cost parameters; fixed for the life of the process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // argon2 crate defaults (OWASP minimums)
        Self { memory_kib: 19 * 1024, iterations: 2, parallelism: 1 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisioningConfig {
    /// Total attempts when a generated username or account number collides.
    pub max_attempts: u32,
}

impl Default for ProvisioningConfig {
    fn default() -> Self { Self { max_attempts: 5 } }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub http_port: u16,
    pub db_path: PathBuf,
    pub pool_size: u32,
    pub token: TokenConfig,
    pub password: PasswordConfig,
    pub provisioning: ProvisioningConfig,
}

impl AppConfig {
    /// Defaults for everything except the secret, which has no sensible default.
    pub fn with_secret<S: Into<String>>(secret: S) -> Self {
        Self {
            http_port: 3030,
            db_path: PathBuf::from("teller.db"),
            pool_size: 8,
            token: TokenConfig { secret: secret.into(), ttl_secs: 15 * 60 },
            password: PasswordConfig::default(),
            provisioning: ProvisioningConfig::default(),
        }
    }

    /// Build from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. `lookup` returns `None` for unset names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("TELLER_JWT_SECRET").ok_or(ConfigError::MissingSecret)?;
        let mut cfg = Self::with_secret(secret);

        if let Some(v) = lookup("TELLER_HTTP_PORT") { cfg.http_port = parse_var("TELLER_HTTP_PORT", &v)?; }
        if let Some(v) = lookup("TELLER_DB_PATH") { cfg.db_path = PathBuf::from(v); }
        if let Some(v) = lookup("TELLER_POOL_SIZE") { cfg.pool_size = parse_var("TELLER_POOL_SIZE", &v)?; }
        if let Some(v) = lookup("TELLER_TOKEN_TTL_SECS") { cfg.token.ttl_secs = parse_var("TELLER_TOKEN_TTL_SECS", &v)?; }
        if let Some(v) = lookup("TELLER_ARGON2_MEMORY_KIB") { cfg.password.memory_kib = parse_var("TELLER_ARGON2_MEMORY_KIB", &v)?; }
        if let Some(v) = lookup("TELLER_ARGON2_ITERATIONS") { cfg.password.iterations = parse_var("TELLER_ARGON2_ITERATIONS", &v)?; }
        if let Some(v) = lookup("TELLER_ARGON2_PARALLELISM") { cfg.password.parallelism = parse_var("TELLER_ARGON2_PARALLELISM", &v)?; }
        if let Some(v) = lookup("TELLER_MAX_PROVISION_ATTEMPTS") {
            cfg.provisioning.max_attempts = parse_var("TELLER_MAX_PROVISION_ATTEMPTS", &v)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret);
        }
        if self.token.ttl_secs <= 0 {
            return Err(invalid("TELLER_TOKEN_TTL_SECS", self.token.ttl_secs));
        }
        if self.pool_size == 0 {
            return Err(invalid("TELLER_POOL_SIZE", self.pool_size));
        }
        if self.provisioning.max_attempts == 0 {
            return Err(invalid("TELLER_MAX_PROVISION_ATTEMPTS", self.provisioning.max_attempts));
        }
        // Bounds enforced by argon2::Params
        if self.password.memory_kib < 8 * self.password.parallelism.max(1) {
            return Err(invalid("TELLER_ARGON2_MEMORY_KIB", self.password.memory_kib));
        }
        if self.password.iterations == 0 {
            return Err(invalid("TELLER_ARGON2_ITERATIONS", self.password.iterations));
        }
        if self.password.parallelism == 0 || self.password.parallelism > 0x00ff_ffff {
            return Err(invalid("TELLER_ARGON2_PARALLELISM", self.password.parallelism));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid { name, value: raw.to_string() })
}

fn invalid<V: ToString>(name: &'static str, value: V) -> ConfigError {
    ConfigError::Invalid { name, value: value.to_string() }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

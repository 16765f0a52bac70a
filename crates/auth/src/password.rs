//! Password policy and hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must be at least {0} characters")]
    TooShort(usize),

    #[error("password must be at most {0} characters")]
    TooLong(usize),

    #[error("password must contain at least one letter and one digit")]
    TooWeak,

    #[error("new password must differ from the current password")]
    Unchanged,

    #[error("current password is incorrect")]
    Mismatch,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Rules a new password must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_len: 8, max_len: 72 }
    }
}

impl PasswordPolicy {
    /// Check a candidate password; `current` is compared when changing.
    pub fn check(&self, candidate: &str, current: Option<&str>) -> Result<(), PasswordError> {
        let len = candidate.chars().count();
        if len < self.min_len {
            return Err(PasswordError::TooShort(self.min_len));
        }
        if len > self.max_len {
            return Err(PasswordError::TooLong(self.max_len));
        }

        let has_letter = candidate.chars().any(|c| c.is_alphabetic());
        let has_digit = candidate.chars().any(|c| c.is_ascii_digit());
        if !has_letter || !has_digit {
            return Err(PasswordError::TooWeak);
        }

        if current == Some(candidate) {
            return Err(PasswordError::Unchanged);
        }

        Ok(())
    }
}

pub trait PasswordHasher: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String, PasswordError>;
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// Argon2id hasher producing PHC strings.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Argon2Hasher {
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    pub fn production() -> Self {
        Self::new(19_456, 2, 1)
    }

    /// Cheap parameters for tests and local development.
    pub fn development() -> Self {
        Self::new(1_024, 1, 1)
    }

    fn argon2(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = argon2::Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params))
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut thread_rng());
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::Hash(e.to_string()))?;
        // Parameters come from the PHC string itself.
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Random alphanumeric password that satisfies the default policy.
pub fn generate_temporary_password(len: usize) -> String {
    let policy = PasswordPolicy::default();
    let len = len.clamp(policy.min_len, policy.max_len);
    loop {
        let candidate: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        if policy.check(&candidate, None).is_ok() {
            return candidate;
        }
    }
}

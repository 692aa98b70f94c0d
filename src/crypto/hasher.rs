//! Dual-hash scheme for credential secrets.
//!
//! - **Verification hash**: Argon2id with a fresh random salt per call, PHC
//!   encoded so the salt and work factor travel inside the hash string. This
//!   is the only value that gates trust decisions.
//! - **Lookup hash**: unsalted SHA-256, hex encoded. Deterministic, so it can
//!   back a unique index and turn "which row does this secret belong to" into
//!   a point query before the expensive verification runs.
//! - **Display form**: fixed-length prefix plus a masking marker, for UI only.
//!
//! All three are pure functions of their input; the hasher holds nothing but
//! the read-only work factor.

use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::errors::HashingError;

/// Number of leading secret characters kept in the display form.
pub const DISPLAY_PREFIX_LEN: usize = 8;
pub const DISPLAY_MASK: &str = "...";

const SALT_BYTES: usize = 16;

/// Argon2id work factor. Fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashConfig {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Iterations.
    pub t_cost: u32,
    /// Lanes.
    pub p_cost: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

impl HashConfig {
    pub fn params(&self) -> Result<Params, argon2::Error> {
        Params::new(self.m_cost, self.t_cost, self.p_cost, None)
    }
}

#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(config: HashConfig) -> Result<Self, HashingError> {
        let params = config
            .params()
            .map_err(|e| HashingError::Algorithm(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Slow, salted, one-way hash. Two calls with the same secret return
    /// different strings; never use the result as a lookup key.
    ///
    /// CPU-bound for tens to hundreds of milliseconds. Async callers should
    /// run it on a blocking thread.
    pub fn derive_verification_hash(&self, secret: &str) -> Result<String, HashingError> {
        let mut salt_bytes = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| HashingError::Algorithm(e.to_string()))?;
        let phc = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| HashingError::Algorithm(e.to_string()))?
            .to_string();
        Ok(phc)
    }

    /// Check `secret` against a stored verification hash.
    ///
    /// Parameters are read from the PHC string, so hashes produced under an
    /// older work factor still verify. A malformed hash is a mismatch, not an error.
    pub fn verify(&self, secret: &str, verification_hash: &str) -> bool {
        match PasswordHash::new(verification_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// Fast, deterministic, unsalted SHA-256 of the secret (lowercase hex).
pub fn derive_lookup_hash(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Truncated preview of a secret: the first [`DISPLAY_PREFIX_LEN`]
/// characters followed by [`DISPLAY_MASK`]. A secret no longer than the
/// prefix is masked entirely.
pub fn derive_display(secret: &str) -> String {
    if secret.chars().count() <= DISPLAY_PREFIX_LEN {
        return DISPLAY_MASK.to_string();
    }
    let prefix: String = secret.chars().take(DISPLAY_PREFIX_LEN).collect();
    format!("{}{}", prefix, DISPLAY_MASK)
}

#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    // Cheapest valid work factor; keeps the suite fast
    CredentialHasher::new(HashConfig {
        m_cost: 1024,
        t_cost: 1,
        p_cost: 1,
    })
    .unwrap()
}

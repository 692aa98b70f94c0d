use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Serialize, Serializer};
use uuid::Uuid;
use zeroize::Zeroize;

/// Number of random bytes behind every raw secret (256 bits).
const SECRET_BYTES: usize = 32;
/// Number of random bytes behind every public key (128 bits).
const PUBLIC_KEY_BYTES: usize = 16;

pub const SECRET_PREFIX: &str = "sk-";
pub const PUBLIC_KEY_PREFIX: &str = "pk-";

/// Cleartext credential secret.
///
/// Lives only in memory between generation and the response that hands it to
/// the caller. Zeroed on drop; `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct RawSecret(String);

impl RawSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RawSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawSecret(****)")
    }
}

/// Serializes as the bare string, so a response body can carry the secret
/// without an intermediate plain `String` copy.
impl Serialize for RawSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl Drop for RawSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Produces identifiers and secrets from the OS entropy source.
///
/// `OsRng` panics if the entropy source is exhausted, which is fatal to the
/// process rather than a recoverable error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretGenerator;

impl SecretGenerator {
    pub fn new_identifier(&self) -> Uuid {
        Uuid::new_v4()
    }

    pub fn new_secret(&self) -> RawSecret {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let secret = RawSecret(format!("{}{}", SECRET_PREFIX, hex::encode(bytes)));
        bytes.zeroize();
        secret
    }

    /// Non-secret half of the credential pair, safe to display and log.
    pub fn new_public_key(&self) -> String {
        let mut bytes = [0u8; PUBLIC_KEY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        format!("{}{}", PUBLIC_KEY_PREFIX, hex::encode(bytes))
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted API credential.
///
/// Holds only derived material; the raw secret is never part of this type.
/// Every field is fixed at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credential {
    pub id: Uuid,
    pub owner_id: String,
    pub public_key: String,
    /// Argon2id PHC string of the secret.
    pub verification_hash: String,
    /// SHA-256 hex of the secret; indexed.
    pub lookup_hash: String,
    pub display_secret: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    pub fn public_ref(&self) -> PublicKeyRef {
        PublicKeyRef {
            id: self.id,
            public_key: self.public_key.clone(),
        }
    }
}

/// Minimal reference for callers that need to locate a credential
/// without re-deriving anything from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublicKeyRef {
    pub id: Uuid,
    pub public_key: String,
}

/// Result of authenticating a presented raw secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedCredential {
    pub id: Uuid,
    pub owner_id: String,
    pub public_key: String,
}

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::TokenError;

/// Identity triple produced by a successful login exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: String,
    pub email: String,
    pub roles: BTreeSet<String>,
}

/// Claims carried by a session token.
///
/// Built once at login, signed, and never mutated. Refreshing a session
/// means issuing a new token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "user_id")]
    pub subject_id: String,
    pub email: String,
    pub roles: BTreeSet<String>,
    #[serde(rename = "iss")]
    pub issuer: String,
    /// Unix seconds.
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Unix seconds. The token is rejected at or after this instant.
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl SessionClaims {
    /// Fails when `issued_at + ttl_secs` does not fit in an `i64`.
    pub fn new(
        identity: Identity,
        issuer: &str,
        issued_at: i64,
        ttl_secs: i64,
    ) -> Result<Self, TokenError> {
        let expires_at = issued_at
            .checked_add(ttl_secs)
            .ok_or_else(|| TokenError::Signing("session expiry overflows i64".into()))?;
        Ok(Self {
            subject_id: identity.subject_id,
            email: identity.email,
            roles: identity.roles,
            issuer: issuer.to_string(),
            issued_at,
            expires_at,
        })
    }

    pub fn identity(&self) -> Identity {
        Identity {
            subject_id: self.subject_id.clone(),
            email: self.email.clone(),
            roles: self.roles.clone(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

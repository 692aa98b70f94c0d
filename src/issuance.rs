use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::crypto::hasher::{derive_display, derive_lookup_hash, CredentialHasher};
use crate::crypto::secret::{RawSecret, SecretGenerator};
use crate::errors::{HashingError, IssuanceError, StoreError};
use crate::models::credential::{Credential, PublicKeyRef, VerifiedCredential};
use crate::store::CredentialStore;

/// Output of a successful issuance. The only place a raw secret leaves the system.
#[derive(Debug)]
pub struct IssuedCredential {
    pub id: Uuid,
    pub public_key: String,
    pub display_secret: String,
    pub secret: RawSecret,
}

/// Issues credentials and authenticates presented secrets.
///
/// Sole owner of credential creation. No internal retries: a failed
/// `issue` leaves nothing persisted and the caller decides whether to retry.
#[derive(Clone)]
pub struct Issuer {
    store: Arc<dyn CredentialStore>,
    hasher: CredentialHasher,
    generator: SecretGenerator,
}

impl Issuer {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: CredentialHasher) -> Self {
        Self {
            store,
            hasher,
            generator: SecretGenerator,
        }
    }

    pub async fn issue(
        &self,
        owner_id: &str,
        note: Option<String>,
    ) -> Result<IssuedCredential, IssuanceError> {
        let id = self.generator.new_identifier();
        let public_key = self.generator.new_public_key();
        let secret = self.generator.new_secret();

        let verification_hash = self.hash_blocking(&secret).await?;
        let lookup_hash = derive_lookup_hash(secret.expose());
        let display_secret = derive_display(secret.expose());

        let credential = Credential {
            id,
            owner_id: owner_id.to_string(),
            public_key: public_key.clone(),
            verification_hash,
            lookup_hash,
            display_secret: display_secret.clone(),
            note,
            created_at: Utc::now(),
        };

        self.store.insert(&credential).await.map_err(|e| {
            tracing::error!(owner_id = %owner_id, credential_id = %id, "credential insert failed: {}", e);
            e
        })?;

        tracing::info!(owner_id = %owner_id, credential_id = %id, public_key = %public_key, "credential issued");
        Ok(IssuedCredential {
            id,
            public_key,
            display_secret,
            secret,
        })
    }

    pub async fn find_by_owner(&self, owner_id: &str) -> Result<PublicKeyRef, StoreError> {
        self.store.find_by_owner(owner_id).await
    }

    /// Resolve a presented raw secret to its credential.
    ///
    /// The lookup hash only selects a candidate row; trust comes from the
    /// slow verification hash. `Ok(None)` for unknown or mismatching secrets.
    pub async fn authenticate(
        &self,
        raw_secret: &str,
    ) -> Result<Option<VerifiedCredential>, IssuanceError> {
        let candidate = match self
            .store
            .find_by_lookup_hash(&derive_lookup_hash(raw_secret))
            .await
        {
            Ok(c) => c,
            Err(StoreError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let hasher = self.hasher.clone();
        let secret = RawSecret::new(raw_secret);
        let stored_hash = candidate.verification_hash.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.verify(secret.expose(), &stored_hash))
            .await
            .map_err(|e| HashingError::Task(e.to_string()))?;

        if !valid {
            tracing::warn!(credential_id = %candidate.id, "lookup hash matched but verification failed");
            return Ok(None);
        }

        Ok(Some(VerifiedCredential {
            id: candidate.id,
            owner_id: candidate.owner_id,
            public_key: candidate.public_key,
        }))
    }

    /// Argon2 is CPU-bound; keep it off the async workers.
    async fn hash_blocking(&self, secret: &RawSecret) -> Result<String, HashingError> {
        let hasher = self.hasher.clone();
        let secret = secret.clone();
        tokio::task::spawn_blocking(move || hasher.derive_verification_hash(secret.expose()))
            .await
            .map_err(|e| HashingError::Task(e.to_string()))?
    }
}

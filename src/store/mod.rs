pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::credential::{Credential, PublicKeyRef};

/// Persistence contract the issuance flow depends on.
/// Implementations: PgStore (Postgres `api_keys` table), InMemoryStore.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Atomically persist a new credential.
    /// `Conflict` if the id (or public key / lookup hash) already exists.
    async fn insert(&self, credential: &Credential) -> Result<(), StoreError>;

    /// Public reference of the owner's most recently issued credential.
    async fn find_by_owner(&self, owner_id: &str) -> Result<PublicKeyRef, StoreError>;

    /// Candidate row for a presented secret, located via its lookup hash.
    async fn find_by_lookup_hash(&self, lookup_hash: &str) -> Result<Credential, StoreError>;
}

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::CredentialStore;
use crate::errors::StoreError;
use crate::models::credential::{Credential, PublicKeyRef};

/// Process-local credential store.
///
/// Enforces the same uniqueness as the `api_keys` table (id, public key,
/// lookup hash). Used by tests and local tooling; contents die with the process.
#[derive(Default)]
pub struct InMemoryStore {
    rows: DashMap<Uuid, Credential>,
    by_public_key: DashMap<String, Uuid>,
    by_lookup_hash: DashMap<String, Uuid>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Snapshot of every stored row.
    pub fn rows(&self) -> Vec<Credential> {
        self.rows.iter().map(|r| r.value().clone()).collect()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn insert(&self, credential: &Credential) -> Result<(), StoreError> {
        // Entry guards are held until the row lands; always taken in this order
        let public_key = match self.by_public_key.entry(credential.public_key.clone()) {
            Entry::Occupied(_) => return Err(StoreError::Conflict),
            Entry::Vacant(v) => v,
        };
        let lookup = match self.by_lookup_hash.entry(credential.lookup_hash.clone()) {
            Entry::Occupied(_) => return Err(StoreError::Conflict),
            Entry::Vacant(v) => v,
        };
        match self.rows.entry(credential.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(v) => {
                v.insert(credential.clone());
                lookup.insert(credential.id);
                public_key.insert(credential.id);
                Ok(())
            }
        }
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<PublicKeyRef, StoreError> {
        self.rows
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .max_by_key(|r| r.created_at)
            .map(|r| r.public_ref())
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_lookup_hash(&self, lookup_hash: &str) -> Result<Credential, StoreError> {
        let id = self
            .by_lookup_hash
            .get(lookup_hash)
            .map(|r| *r.value())
            .ok_or(StoreError::NotFound)?;
        self.rows
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn cred(owner: &str, n: u8) -> Credential {
        Credential {
            id: Uuid::new_v4(),
            owner_id: owner.to_string(),
            public_key: format!("pk-{}", n),
            verification_hash: format!("$argon2id$fake{}", n),
            lookup_hash: format!("lookup-{}", n),
            display_secret: "sk-00000...".to_string(),
            note: None,
            created_at: Utc::now() + Duration::seconds(n as i64),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = InMemoryStore::new();
        let c = cred("org-42", 1);
        store.insert(&c).await.unwrap();

        assert_eq!(store.find_by_owner("org-42").await.unwrap(), c.public_ref());
        assert_eq!(store.find_by_lookup_hash("lookup-1").await.unwrap(), c);
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let store = InMemoryStore::new();
        let c = cred("org-42", 1);
        store.insert(&c).await.unwrap();

        let mut dup = cred("org-7", 2);
        dup.id = c.id;
        assert_eq!(store.insert(&dup).await, Err(StoreError::Conflict));
        // The rejected row left nothing behind
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.find_by_lookup_hash("lookup-2").await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_duplicate_lookup_hash_and_public_key_conflict() {
        let store = InMemoryStore::new();
        store.insert(&cred("org-42", 1)).await.unwrap();

        let mut same_lookup = cred("org-42", 2);
        same_lookup.lookup_hash = "lookup-1".into();
        assert_eq!(store.insert(&same_lookup).await, Err(StoreError::Conflict));

        let mut same_pk = cred("org-42", 3);
        same_pk.public_key = "pk-1".into();
        assert_eq!(store.insert(&same_pk).await, Err(StoreError::Conflict));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_with_same_public_key() {
        let store = Arc::new(InMemoryStore::new());
        let barrier = Arc::new(tokio::sync::Barrier::new(16));

        let tasks: Vec<_> = (0..16u8)
            .map(|n| {
                let store = store.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    let mut c = cred("org-42", n);
                    c.public_key = "pk-shared".into();
                    barrier.wait().await;
                    store.insert(&c).await
                })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => accepted += 1,
                Err(e) => assert_eq!(e, StoreError::Conflict),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_owner_returns_latest() {
        let store = InMemoryStore::new();
        store.insert(&cred("org-42", 1)).await.unwrap();
        let newer = cred("org-42", 5);
        store.insert(&newer).await.unwrap();
        store.insert(&cred("org-7", 9)).await.unwrap();

        assert_eq!(store.find_by_owner("org-42").await.unwrap(), newer.public_ref());
    }

    #[tokio::test]
    async fn test_unknown_owner_not_found() {
        let store = InMemoryStore::new();
        assert_eq!(store.find_by_owner("nobody").await, Err(StoreError::NotFound));
        assert!(store.is_empty());
    }
}

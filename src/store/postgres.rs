use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::CredentialStore;
use crate::errors::StoreError;
use crate::models::credential::{Credential, PublicKeyRef};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn insert(&self, cred: &Credential) -> Result<(), StoreError> {
        // Single statement: the row is committed whole or not at all
        sqlx::query(
            r#"INSERT INTO api_keys (id, owner_id, public_key, hashed_secret_key, fast_hashed_secret_key, display_secret_key, note, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(cred.id)
        .bind(&cred.owner_id)
        .bind(&cred.public_key)
        .bind(&cred.verification_hash)
        .bind(&cred.lookup_hash)
        .bind(&cred.display_secret)
        .bind(&cred.note)
        .bind(cred.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<PublicKeyRef, StoreError> {
        let row = sqlx::query_as::<_, PublicKeyRef>(
            "SELECT id, public_key FROM api_keys WHERE owner_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::NotFound)
    }

    async fn find_by_lookup_hash(&self, lookup_hash: &str) -> Result<Credential, StoreError> {
        let row = sqlx::query_as::<_, Credential>(
            r#"SELECT id, owner_id, public_key,
                      hashed_secret_key AS verification_hash,
                      fast_hashed_secret_key AS lookup_hash,
                      display_secret_key AS display_secret,
                      note, created_at
               FROM api_keys WHERE fast_hashed_secret_key = $1"#,
        )
        .bind(lookup_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::NotFound)
    }
}

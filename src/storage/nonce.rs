use async_trait::async_trait;
use tracing::debug;

use crate::db::{DatabaseProxy, Nonce, NonceColumn as Col};
use crate::error::StorageResult;
use crate::predicate::{self, Predicate};

#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Get-or-create on the exact triple. The flag is `false` when the triple
    /// had been used before, i.e. the request is a replay.
    async fn use_nonce(
        &self,
        server_url: &str,
        timestamp: &str,
        salt: &str,
    ) -> StorageResult<(Nonce, bool)>;
}

pub struct SqlNonceStore {
    db: DatabaseProxy,
}

impl SqlNonceStore {
    pub fn new(db: DatabaseProxy) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NonceStore for SqlNonceStore {
    async fn use_nonce(
        &self,
        server_url: &str,
        timestamp: &str,
        salt: &str,
    ) -> StorageResult<(Nonce, bool)> {
        let pool = self.db.pool()?;
        let key = Predicate::eq(Col::ServerUrl, server_url)
            .and(Col::Timestamp, timestamp)
            .and(Col::Salt, salt);

        let mut lookup = predicate::select::<Nonce>(&key);
        if let Some(existing) = lookup.build_query_as::<Nonce>().fetch_optional(&pool).await? {
            debug!(server_url, timestamp, "nonce replayed");
            return Ok((existing, false));
        }

        // A concurrent writer may insert the same triple between the lookup
        // and this statement; the unique index turns that into "no row".
        let inserted = sqlx::query_as::<_, Nonce>(
            r#"
            INSERT INTO social_auth_nonce (server_url, timestamp, salt)
            VALUES (?, ?, ?)
            ON CONFLICT(server_url, timestamp, salt) DO NOTHING
            RETURNING id, server_url, timestamp, salt
            "#,
        )
        .bind(server_url)
        .bind(timestamp)
        .bind(salt)
        .fetch_optional(&pool)
        .await?;

        match inserted {
            Some(nonce) => Ok((nonce, true)),
            None => {
                let mut lookup = predicate::select::<Nonce>(&key);
                let existing = lookup.build_query_as::<Nonce>().fetch_one(&pool).await?;
                debug!(server_url, timestamp, "nonce inserted concurrently");
                Ok((existing, false))
            }
        }
    }
}

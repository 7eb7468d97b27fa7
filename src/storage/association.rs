use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use crate::db::{Association, AssociationColumn as Col, DatabaseProxy};
use crate::error::{StorageError, StorageResult};
use crate::predicate::{self, Predicate};

/// An OpenID association as the consumer library hands it over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenIdAssociation {
    pub handle: String,
    /// Raw shared secret.
    pub secret: Vec<u8>,
    /// Unix timestamp.
    pub issued: i64,
    /// Seconds.
    pub lifetime: i64,
    pub assoc_type: String,
}

impl OpenIdAssociation {
    /// Seconds left at `now` (unix timestamp), never negative.
    pub fn expires_in(&self, now: i64) -> i64 {
        (self.issued.saturating_add(self.lifetime) - now).max(0)
    }
}

impl Association {
    pub fn secret_bytes(&self) -> StorageResult<Vec<u8>> {
        Ok(STANDARD.decode(self.secret.trim())?)
    }

    pub fn openid_association(&self) -> StorageResult<OpenIdAssociation> {
        Ok(OpenIdAssociation {
            handle: self.handle.clone(),
            secret: self.secret_bytes()?,
            issued: parse_stored("issued", &self.issued)?,
            lifetime: parse_stored("lifetime", &self.lifetime)?,
            assoc_type: self.assoc_type.clone(),
        })
    }
}

fn parse_stored(field: &'static str, value: &str) -> StorageResult<i64> {
    value.trim().parse().map_err(|_| StorageError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// Inserts or updates the row keyed by `(server_url, association.handle)`.
    async fn store(
        &self,
        server_url: &str,
        association: &OpenIdAssociation,
    ) -> StorageResult<Association>;

    async fn get(&self, criteria: Predicate<Col>) -> StorageResult<Vec<Association>>;

    /// Deletes rows by id; unknown ids are ignored. Returns rows deleted.
    async fn remove(&self, ids: &[i64]) -> StorageResult<u64>;

    /// `(id, association)` pairs for a server, newest `issued` first.
    async fn oids(
        &self,
        server_url: &str,
        handle: Option<&str>,
    ) -> StorageResult<Vec<(i64, OpenIdAssociation)>> {
        let mut criteria = Predicate::eq(Col::ServerUrl, server_url);
        if let Some(handle) = handle {
            criteria = criteria.and(Col::Handle, handle);
        }
        let mut oids = self
            .get(criteria)
            .await?
            .iter()
            .map(|assoc| Ok((assoc.id, assoc.openid_association()?)))
            .collect::<StorageResult<Vec<_>>>()?;
        oids.sort_by(|a, b| b.1.issued.cmp(&a.1.issued));
        Ok(oids)
    }

    /// Newest association for `server_url` still valid at `now` (unix
    /// timestamp). Expired rows for the server are deleted on the way.
    async fn get_association(
        &self,
        server_url: &str,
        handle: Option<&str>,
        now: i64,
    ) -> StorageResult<Option<OpenIdAssociation>> {
        let (live, expired): (Vec<_>, Vec<_>) = self
            .oids(server_url, handle)
            .await?
            .into_iter()
            .partition(|(_, assoc)| assoc.expires_in(now) > 0);

        if !expired.is_empty() {
            let ids: Vec<i64> = expired.iter().map(|(id, _)| *id).collect();
            self.remove(&ids).await?;
        }
        Ok(live.into_iter().next().map(|(_, assoc)| assoc))
    }
}

pub struct SqlAssociationStore {
    db: DatabaseProxy,
}

impl SqlAssociationStore {
    pub fn new(db: DatabaseProxy) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AssociationStore for SqlAssociationStore {
    async fn store(
        &self,
        server_url: &str,
        association: &OpenIdAssociation,
    ) -> StorageResult<Association> {
        let pool = self.db.pool()?;
        let secret = STANDARD.encode(&association.secret);

        let row = sqlx::query_as::<_, Association>(
            r#"
            INSERT INTO social_auth_association (
                server_url, handle, secret, issued, lifetime, assoc_type
            )
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(server_url, handle) DO UPDATE SET
                secret = excluded.secret,
                issued = excluded.issued,
                lifetime = excluded.lifetime,
                assoc_type = excluded.assoc_type
            RETURNING id, server_url, handle, secret, issued, lifetime, assoc_type
            "#,
        )
        .bind(server_url)
        .bind(&association.handle)
        .bind(secret)
        .bind(association.issued.to_string())
        .bind(association.lifetime.to_string())
        .bind(&association.assoc_type)
        .fetch_one(&pool)
        .await?;

        debug!(
            server_url,
            handle = %association.handle,
            id = row.id,
            assoc_type = %association.assoc_type,
            "association stored"
        );
        Ok(row)
    }

    async fn get(&self, criteria: Predicate<Col>) -> StorageResult<Vec<Association>> {
        let pool = self.db.pool()?;
        let mut qb = predicate::select::<Association>(&criteria);
        qb.push(" ORDER BY id");
        Ok(qb.build_query_as::<Association>().fetch_all(&pool).await?)
    }

    async fn remove(&self, ids: &[i64]) -> StorageResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let pool = self.db.pool()?;

        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM social_auth_association WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let affected = qb.build().execute(&pool).await?.rows_affected();
        debug!(requested = ids.len(), affected, "associations removed");
        Ok(affected)
    }
}

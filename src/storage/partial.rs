use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::blob;
use crate::db::{DatabaseProxy, DbPartial, PartialColumn as Col};
use crate::error::{StorageError, StorageResult};
use crate::predicate::{self, Predicate};

/// Saved progress of an interrupted pipeline, resumable by `token`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Partial {
    /// `None` until the partial has been stored.
    pub id: Option<i64>,
    pub token: String,
    pub data: Option<Value>,
    pub next_step: i64,
    pub backend: String,
}

impl TryFrom<DbPartial> for Partial {
    type Error = StorageError;

    fn try_from(row: DbPartial) -> Result<Self, Self::Error> {
        Ok(Self {
            data: blob::decode(row.data.as_deref())?,
            id: Some(row.id),
            token: row.token,
            next_step: row.next_step,
            backend: row.backend,
        })
    }
}

impl Partial {
    /// An unsaved partial with a fresh random token.
    pub fn prepare(backend: &str, next_step: i64, data: Value) -> Self {
        Self {
            id: None,
            token: Uuid::new_v4().simple().to_string(),
            data: Some(data),
            next_step,
            backend: backend.to_string(),
        }
    }

    /// Positional arguments saved under `data.args`.
    pub fn args(&self) -> Vec<Value> {
        self.data
            .as_ref()
            .and_then(|d| d.get("args"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    /// Keyword arguments saved under `data.kwargs`.
    pub fn kwargs(&self) -> Map<String, Value> {
        self.data
            .as_ref()
            .and_then(|d| d.get("kwargs"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Merges `values` into `data.kwargs`, creating both when missing.
    pub fn extend_kwargs(&mut self, values: Map<String, Value>) {
        let mut kwargs = self.kwargs();
        kwargs.extend(values);

        let mut data = match self.data.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        data.insert("kwargs".to_string(), Value::Object(kwargs));
        self.data = Some(Value::Object(data));
    }
}

#[async_trait]
pub trait PartialStore: Send + Sync {
    fn prepare(&self, backend: &str, next_step: i64, data: Value) -> Partial {
        Partial::prepare(backend, next_step, data)
    }

    /// Inserts `partial`, or updates the row that already holds its token.
    async fn store(&self, partial: Partial) -> StorageResult<Partial>;

    async fn load(&self, token: &str) -> StorageResult<Option<Partial>>;

    /// Deletes the partial for `token`; nothing happens when there is none.
    async fn destroy(&self, token: &str) -> StorageResult<()>;
}

pub struct SqlPartialStore {
    db: DatabaseProxy,
}

impl SqlPartialStore {
    pub fn new(db: DatabaseProxy) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PartialStore for SqlPartialStore {
    async fn store(&self, partial: Partial) -> StorageResult<Partial> {
        let pool = self.db.pool()?;
        let data = blob::encode_optional(partial.data.as_ref())?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO social_auth_partial (token, data, next_step, backend)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(token) DO UPDATE SET
                data = excluded.data,
                next_step = excluded.next_step,
                backend = excluded.backend
            RETURNING id
            "#,
        )
        .bind(&partial.token)
        .bind(data)
        .bind(partial.next_step)
        .bind(&partial.backend)
        .fetch_one(&pool)
        .await?;

        debug!(
            id,
            backend = %partial.backend,
            next_step = partial.next_step,
            "partial pipeline stored"
        );
        Ok(Partial {
            id: Some(id),
            ..partial
        })
    }

    async fn load(&self, token: &str) -> StorageResult<Option<Partial>> {
        let pool = self.db.pool()?;
        let mut qb = predicate::select::<DbPartial>(&Predicate::eq(Col::Token, token));
        qb.push(" LIMIT 1");
        let row = qb
            .build_query_as::<DbPartial>()
            .fetch_optional(&pool)
            .await?;
        row.map(Partial::try_from).transpose()
    }

    async fn destroy(&self, token: &str) -> StorageResult<()> {
        let Some(partial) = self.load(token).await? else {
            return Ok(());
        };
        let Some(id) = partial.id else {
            return Ok(());
        };
        let pool = self.db.pool()?;
        predicate::delete::<DbPartial>(&Predicate::eq(Col::Id, id))
            .build()
            .execute(&pool)
            .await?;
        debug!(id, backend = %partial.backend, "partial pipeline destroyed");
        Ok(())
    }
}

use std::str::FromStr;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::db::schema::{SOCIAL_AUTH_INIT, USER_INIT};
use crate::error::{StorageError, StorageResult};

/// Late-bound handle to the connection pool.
///
/// Stores hold a clone of the proxy and resolve the pool on every call, so the
/// proxy can be created before the database is known and rebound between
/// tests. Clones share the same slot.
#[derive(Clone, Default)]
pub struct DatabaseProxy {
    slot: Arc<RwLock<Option<SqlitePool>>>,
}

/// Process-wide handle used by [`SocialStorage::global`](crate::storage::SocialStorage::global).
pub static DATABASE: LazyLock<DatabaseProxy> = LazyLock::new(DatabaseProxy::new);

impl DatabaseProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A proxy that is already bound to `pool`.
    pub fn bound(pool: SqlitePool) -> Self {
        let proxy = Self::new();
        proxy.bind(pool);
        proxy
    }

    /// Binds `pool`, returning the previously bound pool if any.
    pub fn bind(&self, pool: SqlitePool) -> Option<SqlitePool> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        debug!(rebound = slot.is_some(), "database proxy bound");
        slot.replace(pool)
    }

    /// Clears the slot; later queries fail with [`StorageError::NotBound`].
    pub fn unbind(&self) -> Option<SqlitePool> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn is_bound(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The bound pool (a cheap reference-counted clone).
    pub fn pool(&self) -> StorageResult<SqlitePool> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StorageError::NotBound)
    }

    /// Connects with `config` and binds the resulting pool.
    pub async fn bind_config(&self, config: &DatabaseConfig) -> StorageResult<SqlitePool> {
        let pool = connect(config).await?;
        self.bind(pool.clone());
        Ok(pool)
    }
}

impl std::fmt::Debug for DatabaseProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseProxy")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Opens a pool for `config` and applies the schema when configured to.
pub async fn connect(config: &DatabaseConfig) -> StorageResult<SqlitePool> {
    let connect_opts = SqliteConnectOptions::from_str(config.url.as_str())
        .map_err(|e| StorageError::Config(format!("invalid database url: {e}")))?
        .create_if_missing(config.create_if_missing)
        .busy_timeout(config.busy_timeout())
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connect_opts)
        .await?;

    if config.apply_schema {
        apply_schema(&pool, SOCIAL_AUTH_INIT).await?;
        if config.default_user_table {
            apply_schema(&pool, USER_INIT).await?;
        }
    }

    info!(
        url = %config.url,
        max_connections = config.max_connections,
        schema_applied = config.apply_schema,
        "social storage database connected"
    );
    Ok(pool)
}

/// Executes each `;`-separated statement of `ddl`.
pub async fn apply_schema(pool: &SqlitePool, ddl: &str) -> StorageResult<()> {
    for stmt in ddl.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}

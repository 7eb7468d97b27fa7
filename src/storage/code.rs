use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::db::{Code, CodeColumn as Col, DatabaseProxy};
use crate::error::StorageResult;
use crate::predicate::{self, Predicate};

#[async_trait]
pub trait CodeStore: Send + Sync {
    async fn get_code(&self, code: &str) -> StorageResult<Option<Code>>;

    /// Issues a fresh, unverified code for `email`.
    async fn make_code(&self, email: &str) -> StorageResult<Code>;

    /// Marks `code` verified and persists it.
    async fn verify(&self, code: &mut Code) -> StorageResult<()>;
}

pub struct SqlCodeStore {
    db: DatabaseProxy,
}

impl SqlCodeStore {
    pub fn new(db: DatabaseProxy) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CodeStore for SqlCodeStore {
    async fn get_code(&self, code: &str) -> StorageResult<Option<Code>> {
        let pool = self.db.pool()?;
        let mut qb = predicate::select::<Code>(&Predicate::eq(Col::Code, code));
        qb.push(" LIMIT 1");
        Ok(qb.build_query_as::<Code>().fetch_optional(&pool).await?)
    }

    async fn make_code(&self, email: &str) -> StorageResult<Code> {
        let pool = self.db.pool()?;
        let code = Uuid::new_v4().simple().to_string();
        let issued = Utc::now().to_rfc3339();

        let row = sqlx::query_as::<_, Code>(
            r#"
            INSERT INTO social_auth_code (email, code, verified, issued)
            VALUES (?, ?, 0, ?)
            RETURNING id, email, code, verified, issued
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(issued)
        .fetch_one(&pool)
        .await?;

        debug!(email, id = row.id, "verification code issued");
        Ok(row)
    }

    async fn verify(&self, code: &mut Code) -> StorageResult<()> {
        let pool = self.db.pool()?;
        sqlx::query("UPDATE social_auth_code SET verified = 1 WHERE id = ?")
            .bind(code.id)
            .execute(&pool)
            .await?;
        code.verified = true;
        debug!(email = %code.email, id = code.id, "verification code verified");
        Ok(())
    }
}

use std::fmt::Display;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use super::social_auth::UserSocialAuth;
use super::user_model::{NewUser, UserModel};
use crate::blob;
use crate::db::{DatabaseProxy, DbUserSocialAuth, UserSocialAuthColumn as Col};
use crate::error::StorageResult;
use crate::predicate::{self, Column, Predicate};

/// Operations the pipeline needs on user <-> provider links and on users.
#[async_trait]
pub trait UserStore<M: UserModel>: Send + Sync {
    /// Link for `(provider, uid)`; `uid` is compared as text.
    async fn get_social_auth(
        &self,
        provider: &str,
        uid: &(dyn Display + Sync),
    ) -> StorageResult<Option<UserSocialAuth>>;

    /// Links owned by `user`, optionally narrowed by provider and/or id.
    /// An empty provider name does not narrow.
    async fn get_social_auth_for_user(
        &self,
        user: &M,
        provider: Option<&str>,
        id: Option<i64>,
    ) -> StorageResult<Vec<UserSocialAuth>>;

    async fn create_social_auth(
        &self,
        user: &M,
        uid: &(dyn Display + Sync),
        provider: &str,
    ) -> StorageResult<UserSocialAuth>;

    /// Merges `extra_data` into `entry` and writes it back if anything changed.
    async fn set_extra_data(
        &self,
        entry: &mut UserSocialAuth,
        extra_data: Value,
    ) -> StorageResult<bool>;

    /// Persists `user` through the model's own `save`.
    async fn changed(&self, user: &M) -> StorageResult<()>;

    /// Whether `user` keeps a way to log in after dropping one link.
    ///
    /// The link being dropped is identified by `association_id` when given,
    /// otherwise by `backend_name`.
    async fn allowed_to_disconnect(
        &self,
        user: &M,
        backend_name: &str,
        association_id: Option<i64>,
    ) -> StorageResult<bool>;

    async fn disconnect(&self, entry: &UserSocialAuth) -> StorageResult<()>;

    async fn user_exists(&self, criteria: Predicate<M::Column>) -> StorageResult<bool>;

    async fn create_user(&self, fields: NewUser<M::Column>) -> StorageResult<M>;

    /// `pk` takes precedence over `criteria`.
    async fn get_user(
        &self,
        pk: Option<i64>,
        criteria: Predicate<M::Column>,
    ) -> StorageResult<Option<M>>;

    async fn get_users_by_email(&self, email: &str) -> StorageResult<Vec<M>>;

    fn username_max_length(&self) -> usize {
        M::USERNAME_MAX_LENGTH
    }

    fn get_username(&self, user: &M) -> Option<String> {
        user.username().map(str::to_string)
    }
}

/// [`UserStore`] over `social_auth_usersocialauth` and the model's table.
pub struct SqlUserStore<M> {
    db: DatabaseProxy,
    _model: PhantomData<fn() -> M>,
}

impl<M> SqlUserStore<M> {
    pub fn new(db: DatabaseProxy) -> Self {
        Self {
            db,
            _model: PhantomData,
        }
    }
}

#[async_trait]
impl<M: UserModel> UserStore<M> for SqlUserStore<M> {
    async fn get_social_auth(
        &self,
        provider: &str,
        uid: &(dyn Display + Sync),
    ) -> StorageResult<Option<UserSocialAuth>> {
        let pool = self.db.pool()?;
        let criteria = Predicate::eq(Col::Provider, provider).and(Col::Uid, uid.to_string());

        let mut qb = predicate::select::<DbUserSocialAuth>(&criteria);
        qb.push(" LIMIT 1");
        let row = qb
            .build_query_as::<DbUserSocialAuth>()
            .fetch_optional(&pool)
            .await?;

        row.map(UserSocialAuth::try_from).transpose()
    }

    async fn get_social_auth_for_user(
        &self,
        user: &M,
        provider: Option<&str>,
        id: Option<i64>,
    ) -> StorageResult<Vec<UserSocialAuth>> {
        let pool = self.db.pool()?;
        let mut criteria = Predicate::eq(Col::UserId, user.pk());
        if let Some(provider) = provider.filter(|p| !p.is_empty()) {
            criteria = criteria.and(Col::Provider, provider);
        }
        if let Some(id) = id {
            criteria = criteria.and(Col::Id, id);
        }

        let mut qb = predicate::select::<DbUserSocialAuth>(&criteria);
        qb.push(" ORDER BY id");
        let rows = qb
            .build_query_as::<DbUserSocialAuth>()
            .fetch_all(&pool)
            .await?;

        rows.into_iter().map(UserSocialAuth::try_from).collect()
    }

    async fn create_social_auth(
        &self,
        user: &M,
        uid: &(dyn Display + Sync),
        provider: &str,
    ) -> StorageResult<UserSocialAuth> {
        let pool = self.db.pool()?;
        let uid = uid.to_string();
        let user_id = user.pk();

        let row = sqlx::query_as::<_, DbUserSocialAuth>(
            r#"
            INSERT INTO social_auth_usersocialauth (provider, uid, user_id)
            VALUES (?, ?, ?)
            RETURNING id, provider, uid, extra_data, user_id
            "#,
        )
        .bind(provider)
        .bind(&uid)
        .bind(user_id)
        .fetch_one(&pool)
        .await?;

        debug!(provider, uid = %uid, user_id, id = row.id, "social auth created");
        UserSocialAuth::try_from(row)
    }

    async fn set_extra_data(
        &self,
        entry: &mut UserSocialAuth,
        extra_data: Value,
    ) -> StorageResult<bool> {
        if !entry.merge_extra_data(extra_data) {
            return Ok(false);
        }
        let pool = self.db.pool()?;
        let encoded = blob::encode_optional(entry.extra_data.as_ref())?;

        let res = sqlx::query("UPDATE social_auth_usersocialauth SET extra_data = ? WHERE id = ?")
            .bind(encoded)
            .bind(entry.id)
            .execute(&pool)
            .await?;

        debug!(
            id = entry.id,
            provider = %entry.provider,
            affected = res.rows_affected(),
            "extra data updated"
        );
        Ok(true)
    }

    async fn changed(&self, user: &M) -> StorageResult<()> {
        let pool = self.db.pool()?;
        user.save(&pool).await
    }

    async fn allowed_to_disconnect(
        &self,
        user: &M,
        backend_name: &str,
        association_id: Option<i64>,
    ) -> StorageResult<bool> {
        if user.has_usable_password() {
            return Ok(true);
        }
        let pool = self.db.pool()?;
        let others = Predicate::eq(Col::UserId, user.pk());
        let others = match association_id {
            Some(id) => others.and_not(Col::Id, id),
            None => others.and_not(Col::Provider, backend_name),
        };

        let remaining: i64 = predicate::count::<DbUserSocialAuth>(&others)
            .build_query_scalar::<i64>()
            .fetch_one(&pool)
            .await?;

        Ok(remaining > 0)
    }

    async fn disconnect(&self, entry: &UserSocialAuth) -> StorageResult<()> {
        let pool = self.db.pool()?;
        let res = predicate::delete::<DbUserSocialAuth>(&Predicate::eq(Col::Id, entry.id))
            .build()
            .execute(&pool)
            .await?;

        debug!(
            id = entry.id,
            provider = %entry.provider,
            user_id = entry.user_id,
            affected = res.rows_affected(),
            "social auth disconnected"
        );
        Ok(())
    }

    async fn user_exists(&self, criteria: Predicate<M::Column>) -> StorageResult<bool> {
        let pool = self.db.pool()?;
        let n: i64 = predicate::count::<M>(&criteria)
            .build_query_scalar::<i64>()
            .fetch_one(&pool)
            .await?;
        Ok(n > 0)
    }

    async fn create_user(&self, fields: NewUser<M::Column>) -> StorageResult<M> {
        let pool = self.db.pool()?;
        let fields = fields.into_fields(M::USERNAME_FIELD);

        let mut qb = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {}", M::TABLE));
        if fields.is_empty() {
            qb.push(" DEFAULT VALUES");
        } else {
            qb.push(" (");
            for (i, (column, _)) in fields.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push(column.name());
            }
            qb.push(") VALUES (");
            for (i, (_, value)) in fields.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                value.push_bind(&mut qb);
            }
            qb.push(")");
        }
        qb.push(format!(" RETURNING {}", M::COLUMNS));

        let user = qb.build_query_as::<M>().fetch_one(&pool).await?;
        debug!(table = M::TABLE, pk = user.pk(), "user created");
        Ok(user)
    }

    async fn get_user(
        &self,
        pk: Option<i64>,
        criteria: Predicate<M::Column>,
    ) -> StorageResult<Option<M>> {
        let pool = self.db.pool()?;
        let criteria = match pk {
            Some(pk) => Predicate::eq(M::PRIMARY_KEY, pk),
            None => criteria,
        };

        let mut qb = predicate::select::<M>(&criteria);
        qb.push(" LIMIT 1");
        Ok(qb.build_query_as::<M>().fetch_optional(&pool).await?)
    }

    async fn get_users_by_email(&self, email: &str) -> StorageResult<Vec<M>> {
        let pool = self.db.pool()?;
        let mut qb = predicate::select::<M>(&Predicate::eq(M::EMAIL_FIELD, email));
        qb.push(" ORDER BY ");
        qb.push(M::PRIMARY_KEY.name());
        Ok(qb.build_query_as::<M>().fetch_all(&pool).await?)
    }
}

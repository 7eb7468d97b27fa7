//! The application's user model, as seen by the user-association store.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};

use crate::db::{User, UserColumn};
use crate::error::StorageResult;
use crate::predicate::{Column, FieldValue, Table};

/// A user table the social-auth layer can query and create rows in.
///
/// Implement this for the application's own user struct to plug it into
/// [`SqlUserStore`](super::SqlUserStore); [`User`] is the bundled default.
#[async_trait]
pub trait UserModel:
    Table + for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin + Sized + 'static
{
    const PRIMARY_KEY: Self::Column;
    const USERNAME_FIELD: Self::Column;
    const EMAIL_FIELD: Self::Column;
    const USERNAME_MAX_LENGTH: usize;

    fn pk(&self) -> i64;

    fn username(&self) -> Option<&str>;

    /// Models without a password concept always count as having one.
    fn has_usable_password(&self) -> bool {
        true
    }

    /// Persists the in-memory state of `self`.
    async fn save(&self, pool: &SqlitePool) -> StorageResult<()>;
}

#[async_trait]
impl UserModel for User {
    const PRIMARY_KEY: UserColumn = UserColumn::Id;
    const USERNAME_FIELD: UserColumn = UserColumn::Username;
    const EMAIL_FIELD: UserColumn = UserColumn::Email;
    const USERNAME_MAX_LENGTH: usize = 150;

    fn pk(&self) -> i64 {
        self.id
    }

    fn username(&self) -> Option<&str> {
        Some(self.username.as_str())
    }

    fn has_usable_password(&self) -> bool {
        self.password
            .as_deref()
            .is_some_and(|p| !p.is_empty() && !p.starts_with('!'))
    }

    async fn save(&self, pool: &SqlitePool) -> StorageResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = ?, email = ?, password = ?, is_active = ?
            WHERE id = ?
            "#,
        )
        .bind(&self.username)
        .bind(&self.email)
        .bind(&self.password)
        .bind(self.is_active)
        .bind(self.id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Column values for a new user row.
///
/// `username` is an alias for the model's real username column; it only
/// applies when that column was not set explicitly.
#[derive(Debug, Clone)]
pub struct NewUser<C: Column> {
    fields: Vec<(C, FieldValue)>,
    username: Option<FieldValue>,
}

impl<C: Column> Default for NewUser<C> {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            username: None,
        }
    }
}

impl<C: Column> NewUser<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn username(mut self, value: impl Into<FieldValue>) -> Self {
        self.username = Some(value.into());
        self
    }

    /// Sets `column`, replacing an earlier value for it.
    pub fn set(mut self, column: C, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    /// Final column list with the alias folded into `username_field`.
    pub fn into_fields(self, username_field: C) -> Vec<(C, FieldValue)> {
        let mut fields = self.fields;
        if let Some(username) = self.username {
            if !fields.iter().any(|(c, _)| *c == username_field) {
                fields.push((username_field, username));
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(password: Option<&str>) -> User {
        User {
            id: 1,
            username: "foobar".to_string(),
            email: "foo@bar.com".to_string(),
            password: password.map(str::to_string),
            is_active: true,
        }
    }

    #[test]
    fn usable_password_rules() {
        assert!(user(Some("pbkdf2$hash")).has_usable_password());
        assert!(!user(None).has_usable_password());
        assert!(!user(Some("")).has_usable_password());
        assert!(!user(Some("!unusable")).has_usable_password());
    }

    #[test]
    fn username_alias_maps_to_model_column() {
        let fields = NewUser::new()
            .username("foobar")
            .set(UserColumn::Email, "foo@bar.com")
            .into_fields(UserColumn::Username);
        assert_eq!(
            fields,
            vec![
                (UserColumn::Email, FieldValue::from("foo@bar.com")),
                (UserColumn::Username, FieldValue::from("foobar")),
            ]
        );
    }

    #[test]
    fn explicit_username_column_wins_over_alias() {
        let fields = NewUser::new()
            .set(UserColumn::Username, "explicit")
            .username("alias")
            .into_fields(UserColumn::Username);
        assert_eq!(
            fields,
            vec![(UserColumn::Username, FieldValue::from("explicit"))]
        );
    }

    #[test]
    fn set_replaces_previous_value() {
        let fields = NewUser::new()
            .set(UserColumn::Email, "a@b.c")
            .set(UserColumn::Email, "d@e.f")
            .into_fields(UserColumn::Username);
        assert_eq!(fields, vec![(UserColumn::Email, FieldValue::from("d@e.f"))]);
    }
}

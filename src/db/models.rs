use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::predicate::{Column, Table};

/// Raw `social_auth_usersocialauth` row; `extra_data` is still encoded.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbUserSocialAuth {
    pub id: i64,
    pub provider: String,
    pub uid: String,
    pub extra_data: Option<String>,
    pub user_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSocialAuthColumn {
    Id,
    Provider,
    Uid,
    ExtraData,
    UserId,
}

impl Column for UserSocialAuthColumn {
    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Provider => "provider",
            Self::Uid => "uid",
            Self::ExtraData => "extra_data",
            Self::UserId => "user_id",
        }
    }
}

impl Table for DbUserSocialAuth {
    type Column = UserSocialAuthColumn;
    const TABLE: &'static str = "social_auth_usersocialauth";
    const COLUMNS: &'static str = "id, provider, uid, extra_data, user_id";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Nonce {
    pub id: i64,
    pub server_url: String,
    pub timestamp: String,
    pub salt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceColumn {
    Id,
    ServerUrl,
    Timestamp,
    Salt,
}

impl Column for NonceColumn {
    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ServerUrl => "server_url",
            Self::Timestamp => "timestamp",
            Self::Salt => "salt",
        }
    }
}

impl Table for Nonce {
    type Column = NonceColumn;
    const TABLE: &'static str = "social_auth_nonce";
    const COLUMNS: &'static str = "id, server_url, timestamp, salt";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Association {
    pub id: i64,
    pub server_url: String,
    pub handle: String,
    /// Standard base64 of the raw secret.
    pub secret: String,
    pub issued: String,
    pub lifetime: String,
    pub assoc_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationColumn {
    Id,
    ServerUrl,
    Handle,
    Secret,
    Issued,
    Lifetime,
    AssocType,
}

impl Column for AssociationColumn {
    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ServerUrl => "server_url",
            Self::Handle => "handle",
            Self::Secret => "secret",
            Self::Issued => "issued",
            Self::Lifetime => "lifetime",
            Self::AssocType => "assoc_type",
        }
    }
}

impl Table for Association {
    type Column = AssociationColumn;
    const TABLE: &'static str = "social_auth_association";
    const COLUMNS: &'static str = "id, server_url, handle, secret, issued, lifetime, assoc_type";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Code {
    pub id: i64,
    pub email: String,
    pub code: String,
    pub verified: bool,
    pub issued: String, // RFC3339
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeColumn {
    Id,
    Email,
    Code,
    Verified,
    Issued,
}

impl Column for CodeColumn {
    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Email => "email",
            Self::Code => "code",
            Self::Verified => "verified",
            Self::Issued => "issued",
        }
    }
}

impl Table for Code {
    type Column = CodeColumn;
    const TABLE: &'static str = "social_auth_code";
    const COLUMNS: &'static str = "id, email, code, verified, issued";
}

/// Raw `social_auth_partial` row; `data` is still encoded.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbPartial {
    pub id: i64,
    pub token: String,
    pub data: Option<String>,
    pub next_step: i64,
    pub backend: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialColumn {
    Id,
    Token,
    Data,
    NextStep,
    Backend,
}

impl Column for PartialColumn {
    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Token => "token",
            Self::Data => "data",
            Self::NextStep => "next_step",
            Self::Backend => "backend",
        }
    }
}

impl Table for DbPartial {
    type Column = PartialColumn;
    const TABLE: &'static str = "social_auth_partial";
    const COLUMNS: &'static str = "id, token, data, next_step, backend";
}

/// Bundled user model, backed by the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Password hash. `None`, empty, or `!`-prefixed means unusable.
    pub password: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserColumn {
    Id,
    Username,
    Email,
    Password,
    IsActive,
}

impl Column for UserColumn {
    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Username => "username",
            Self::Email => "email",
            Self::Password => "password",
            Self::IsActive => "is_active",
        }
    }
}

impl Table for User {
    type Column = UserColumn;
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, username, email, password, is_active";
}

//! Database module: row models, schema and the shared pool handle.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows, plus their column enums
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `proxy.rs`: the late-bound pool handle shared by every store

pub mod models;
pub mod proxy;
pub mod schema;

pub use models::{
    Association, AssociationColumn, Code, CodeColumn, DbPartial, DbUserSocialAuth, Nonce,
    NonceColumn, PartialColumn, User, UserColumn, UserSocialAuthColumn,
};
pub use proxy::{DATABASE, DatabaseProxy, apply_schema, connect};
pub use schema::{SOCIAL_AUTH_INIT, USER_INIT};

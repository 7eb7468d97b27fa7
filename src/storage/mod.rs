//! The five storage roles an authentication pipeline talks to, and the
//! [`SocialStorage`] facade that groups them.
//!
//! Each role is a trait (`UserStore`, `NonceStore`, `AssociationStore`,
//! `CodeStore`, `PartialStore`) with a SQLite implementation sharing one
//! [`DatabaseProxy`].

pub mod association;
pub mod code;
pub mod nonce;
pub mod partial;
pub mod social_auth;
pub mod user;
pub mod user_model;

use std::sync::Arc;

pub use association::{AssociationStore, OpenIdAssociation, SqlAssociationStore};
pub use code::{CodeStore, SqlCodeStore};
pub use nonce::{NonceStore, SqlNonceStore};
pub use partial::{Partial, PartialStore, SqlPartialStore};
pub use social_auth::{ACCESS_TOKEN_EXPIRED_THRESHOLD, UserSocialAuth};
pub use user::{SqlUserStore, UserStore};
pub use user_model::{NewUser, UserModel};

use crate::db::{DATABASE, DatabaseProxy, User};
use crate::error::{IsIntegrity, StorageError};

/// The storage roles, addressed by fixed names.
pub struct SocialStorage<M: UserModel = User> {
    pub user: Arc<dyn UserStore<M>>,
    pub nonce: Arc<dyn NonceStore>,
    pub association: Arc<dyn AssociationStore>,
    pub code: Arc<dyn CodeStore>,
    pub partial: Arc<dyn PartialStore>,
}

impl<M: UserModel> SocialStorage<M> {
    /// SQLite-backed roles on top of `db`.
    pub fn new(db: DatabaseProxy) -> Self {
        Self {
            user: Arc::new(SqlUserStore::<M>::new(db.clone())),
            nonce: Arc::new(SqlNonceStore::new(db.clone())),
            association: Arc::new(SqlAssociationStore::new(db.clone())),
            code: Arc::new(SqlCodeStore::new(db.clone())),
            partial: Arc::new(SqlPartialStore::new(db)),
        }
    }

    /// SQLite-backed roles on the process-wide [`DATABASE`] handle.
    pub fn global() -> Self {
        Self::new(DATABASE.clone())
    }

    /// Roles supplied by the caller.
    pub fn with_stores(
        user: Arc<dyn UserStore<M>>,
        nonce: Arc<dyn NonceStore>,
        association: Arc<dyn AssociationStore>,
        code: Arc<dyn CodeStore>,
        partial: Arc<dyn PartialStore>,
    ) -> Self {
        Self {
            user,
            nonce,
            association,
            code,
            partial,
        }
    }

    /// Whether `err` is a constraint violation (e.g. a duplicate natural key)
    /// rather than any other failure.
    pub fn is_integrity_error(err: &StorageError) -> bool {
        err.is_integrity()
    }
}

impl<M: UserModel> Clone for SocialStorage<M> {
    fn clone(&self) -> Self {
        Self {
            user: Arc::clone(&self.user),
            nonce: Arc::clone(&self.nonce),
            association: Arc::clone(&self.association),
            code: Arc::clone(&self.code),
            partial: Arc::clone(&self.partial),
        }
    }
}

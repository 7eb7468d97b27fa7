pub mod blob;
pub mod config;
pub mod db;
pub mod error;
pub mod predicate;
pub mod storage;

pub use config::{Config, DatabaseConfig};
pub use db::{DATABASE, DatabaseProxy};
pub use error::{StorageError, StorageResult};
pub use predicate::{FieldValue, Predicate};
pub use storage::{SocialStorage, UserModel, UserSocialAuth};

use sqlx::error::ErrorKind;
use thiserror::Error as ThisError;

use super::IsIntegrity;

#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error("Database handle is not bound; bind a pool before running queries")]
    NotBound,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Integrity error: {0}")]
    Integrity(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Invalid stored value for `{field}`: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Constraint violations (unique, foreign key, not-null, check) become
/// `Integrity`; every other engine failure stays `Database`.
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if is_constraint_violation(&err) {
            StorageError::Integrity(err)
        } else {
            StorageError::Database(err)
        }
    }
}

impl From<figment::Error> for StorageError {
    fn from(err: figment::Error) -> Self {
        StorageError::Config(err.to_string())
    }
}

/// Whether the engine rejected a statement because of a schema constraint.
pub fn is_constraint_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => matches!(
            db_err.kind(),
            ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
        ),
        _ => false,
    }
}

impl IsIntegrity for StorageError {
    fn is_integrity(&self) -> bool {
        matches!(self, StorageError::Integrity(_))
    }
}

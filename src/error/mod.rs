mod storage;

pub use storage::{StorageError, StorageResult, is_constraint_violation};

pub trait IsIntegrity {
    fn is_integrity(&self) -> bool;
}

use thiserror::Error;

use crate::domain::CategoryId;

/// Error type that captures category and expense store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint failed: `{name}` already exists under parent {parent:?}")]
    UniqueViolation {
        name: String,
        parent: Option<CategoryId>,
    },
    #[error("Parent constraint failed: category {0} does not exist")]
    MissingParent(CategoryId),
    #[error("Parent constraint failed: category {0} still has children")]
    HasDependents(CategoryId),
    #[error("Record not found: category {0}")]
    NotFound(CategoryId),
    #[error("Store lock poisoned")]
    Poisoned,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unsupported store schema version {0}")]
    Schema(u32),
}

pub type StoreResult<T> = Result<T, StoreError>;

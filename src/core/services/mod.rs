pub mod category_service;
pub mod histogram;
pub mod path_resolver;
pub mod stats_service;

pub use category_service::{CategoryService, DeletePlan};
pub use path_resolver::PathResolver;
pub use stats_service::{StatsService, StatsView};

use crate::domain::{category::NameError, CategoryId, DateRangeError};
use crate::errors::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Typed failures surfaced to callers. Validation variants are raised
/// before any mutation; `Store` wraps opaque storage failures.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Category name `{name}` contains forbidden character `{ch}`")]
    InvalidName { name: String, ch: char },
    #[error("Category name cannot be blank")]
    BlankName,
    #[error("Parent category {0} not found")]
    ParentNotFound(CategoryId),
    #[error("Category {0} not found")]
    CategoryNotFound(CategoryId),
    #[error("Category path `{path}` has depth {depth}; at most {max} levels are allowed")]
    DepthExceeded {
        path: String,
        depth: usize,
        max: usize,
    },
    #[error("Category `{name}` already exists at this level")]
    DuplicateSibling {
        name: String,
        parent_id: Option<CategoryId>,
    },
    #[error("Category {id} cannot be moved under itself or its descendant {parent_id}")]
    InvalidParent {
        id: CategoryId,
        parent_id: CategoryId,
    },
    #[error("No category at path `{path}`")]
    PathNotFound { path: String },
    #[error("`{name}` groups several categories and cannot be drilled into")]
    NotDrillable { name: String },
    #[error("Category path `{path}` contains a blank segment")]
    BlankSegment { path: String },
    #[error("Category still has {count} expense(s); reassign them before deleting")]
    HasExpenses { count: usize },
    #[error(transparent)]
    InvalidRange(#[from] DateRangeError),
    #[error(transparent)]
    Store(StoreError),
}

impl ServiceError {
    pub(crate) fn from_name(name: &str, err: NameError) -> Self {
        match err {
            NameError::Blank => ServiceError::BlankName,
            NameError::ForbiddenChar(ch) => ServiceError::InvalidName {
                name: name.to_string(),
                ch,
            },
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { name, parent } => ServiceError::DuplicateSibling {
                name,
                parent_id: parent,
            },
            other => ServiceError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests;

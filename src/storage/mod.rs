//! Collaborator contracts for category and expense persistence.
//!
//! The engine never talks to a concrete backend directly; it issues the
//! queries below and runs every multi-row mutation through
//! [`CategoryStore::transaction`].

pub mod json_backend;
pub mod memory;

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{Amount, Category, CategoryId, DateRange, NewCategory, SpendSnapshot};

pub use crate::errors::{StoreError, StoreResult};
pub use json_backend::{JsonStorage, STORE_SCHEMA_VERSION};
pub use memory::{CategoryTable, MemoryStore, PersistSink, StoreState};

/// Read access to category records.
pub trait CategoryReader {
    fn get_by_id(&self, id: CategoryId) -> StoreResult<Option<Category>>;
    fn get_by_full_path(&self, full_path: &str) -> StoreResult<Option<Category>>;
    /// Direct children of `parent_id`; `None` lists the roots.
    fn get_children(&self, parent_id: Option<CategoryId>) -> StoreResult<Vec<Category>>;
    /// Strict descendants, i.e. every record whose path starts with `full_path + " > "`.
    fn get_descendants_by_prefix(&self, full_path: &str) -> StoreResult<Vec<Category>>;
    fn get_root_by_name(&self, name: &str) -> StoreResult<Option<Category>>;
    /// Every record, read from a single snapshot.
    fn all(&self) -> StoreResult<Vec<Category>>;
}

/// Mutations available inside a transaction.
///
/// Implementations enforce uniqueness of `(name, parent_id)` and refuse to
/// insert under, or delete, a parent that breaks parent existence.
pub trait CategoryWriter: CategoryReader {
    fn insert(&mut self, record: NewCategory) -> StoreResult<CategoryId>;
    fn update(&mut self, category: &Category) -> StoreResult<()>;
    fn delete(&mut self, id: CategoryId) -> StoreResult<()>;
    /// Expenses booked on `full_path` or below, as seen by this transaction.
    /// No expense can be added to the subtree until the transaction ends.
    fn count_expenses_in_scope(&self, full_path: &str) -> StoreResult<usize>;
}

/// Durable category storage with all-or-nothing transactions.
pub trait CategoryStore: CategoryReader + Send + Sync {
    /// Runs `op` against a staged copy of the table. The staged changes
    /// become visible only if `op` returns `Ok` and the commit succeeds.
    fn transaction<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn CategoryWriter) -> Result<T, E>,
        E: From<StoreError>;
}

/// Read-only expense queries. `scope` is a category full path; a scoped
/// query covers that category and all of its descendants.
pub trait ExpenseStore: Send + Sync {
    fn count_by_category_or_descendants(&self, full_path: &str) -> StoreResult<usize>;
    fn sum_amount_in_range(&self, range: DateRange, scope: Option<&str>) -> StoreResult<Amount>;
    fn daily_sums(
        &self,
        range: DateRange,
        scope: Option<&str>,
    ) -> StoreResult<BTreeMap<NaiveDate, Amount>>;
    fn total_in_range(&self, range: DateRange) -> StoreResult<Amount>;
    /// Per-category amount and count for `range`, together with the
    /// category rows they were booked against, read from one snapshot.
    fn spend_snapshot(&self, range: DateRange) -> StoreResult<SpendSnapshot>;
}

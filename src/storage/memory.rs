//! Transactional in-memory store backing both collaborator contracts.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{RwLock, RwLockReadGuard},
};

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{
    category::{descendant_prefix, in_subtree},
    Amount, Category, CategoryId, CategorySpend, DateRange, Expense, ExpenseId, NewCategory,
    SpendSnapshot,
};

use super::{
    CategoryReader, CategoryStore, CategoryWriter, ExpenseStore, StoreError, StoreResult,
};

/// Receives every staged state right before it is committed. A failing
/// sink aborts the commit.
pub trait PersistSink: Send + Sync {
    fn persist(&self, state: &StoreState) -> StoreResult<()>;
}

/// Category rows keyed by id.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    rows: BTreeMap<CategoryId, Category>,
    next_id: CategoryId,
}

impl CategoryTable {
    pub fn from_rows(rows: Vec<Category>) -> Self {
        let next_id = rows.iter().map(|row| row.id).max().unwrap_or(0) + 1;
        Self {
            rows: rows.into_iter().map(|row| (row.id, row)).collect(),
            next_id,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &Category> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn ensure_unique(
        &self,
        name: &str,
        parent_id: Option<CategoryId>,
        exclude: Option<CategoryId>,
    ) -> StoreResult<()> {
        let clash = self.rows.values().any(|row| {
            row.parent_id == parent_id && row.name == name && Some(row.id) != exclude
        });
        if clash {
            return Err(StoreError::UniqueViolation {
                name: name.to_string(),
                parent: parent_id,
            });
        }
        Ok(())
    }

    fn ensure_parent(&self, parent_id: Option<CategoryId>) -> StoreResult<()> {
        match parent_id {
            Some(id) if !self.rows.contains_key(&id) => Err(StoreError::MissingParent(id)),
            _ => Ok(()),
        }
    }

    fn subtree_ids(&self, scope: &str) -> HashSet<CategoryId> {
        self.rows
            .values()
            .filter(|row| in_subtree(&row.full_path, scope))
            .map(|row| row.id)
            .collect()
    }
}

impl CategoryReader for CategoryTable {
    fn get_by_id(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.rows.get(&id).cloned())
    }

    fn get_by_full_path(&self, full_path: &str) -> StoreResult<Option<Category>> {
        Ok(self
            .rows
            .values()
            .find(|row| row.full_path == full_path)
            .cloned())
    }

    fn get_children(&self, parent_id: Option<CategoryId>) -> StoreResult<Vec<Category>> {
        Ok(self
            .rows
            .values()
            .filter(|row| row.parent_id == parent_id)
            .cloned()
            .collect())
    }

    fn get_descendants_by_prefix(&self, full_path: &str) -> StoreResult<Vec<Category>> {
        let prefix = descendant_prefix(full_path);
        Ok(self
            .rows
            .values()
            .filter(|row| row.full_path.starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn get_root_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        Ok(self
            .rows
            .values()
            .find(|row| row.parent_id.is_none() && row.name == name)
            .cloned())
    }

    fn all(&self) -> StoreResult<Vec<Category>> {
        Ok(self.rows.values().cloned().collect())
    }
}

impl CategoryTable {
    fn insert(&mut self, record: NewCategory) -> StoreResult<CategoryId> {
        self.ensure_parent(record.parent_id)?;
        self.ensure_unique(&record.name, record.parent_id, None)?;
        let id = match record.id {
            Some(id) if self.rows.contains_key(&id) => {
                return Err(StoreError::UniqueViolation {
                    name: record.name,
                    parent: record.parent_id,
                })
            }
            Some(id) => id,
            None => self.next_id,
        };
        self.next_id = self.next_id.max(id + 1);
        self.rows.insert(
            id,
            Category {
                id,
                name: record.name,
                icon: record.icon,
                parent_id: record.parent_id,
                full_path: record.full_path,
            },
        );
        Ok(id)
    }

    fn update(&mut self, category: &Category) -> StoreResult<()> {
        if !self.rows.contains_key(&category.id) {
            return Err(StoreError::NotFound(category.id));
        }
        self.ensure_parent(category.parent_id)?;
        self.ensure_unique(&category.name, category.parent_id, Some(category.id))?;
        self.rows.insert(category.id, category.clone());
        Ok(())
    }

    fn delete(&mut self, id: CategoryId) -> StoreResult<()> {
        if !self.rows.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        if self.rows.values().any(|row| row.parent_id == Some(id)) {
            return Err(StoreError::HasDependents(id));
        }
        self.rows.remove(&id);
        Ok(())
    }
}

/// Expense rows in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ExpenseTable {
    rows: Vec<Expense>,
    next_id: ExpenseId,
}

impl ExpenseTable {
    pub fn from_rows(rows: Vec<Expense>) -> Self {
        let next_id = rows.iter().map(|row| row.id).max().unwrap_or(0) + 1;
        Self { rows, next_id }
    }

    pub fn rows(&self) -> &[Expense] {
        &self.rows
    }
}

/// Full contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub categories: CategoryTable,
    pub expenses: ExpenseTable,
}

impl StoreState {
    fn count_in_scope(&self, full_path: &str) -> usize {
        let ids = self.categories.subtree_ids(full_path);
        self.expenses
            .rows
            .iter()
            .filter(|expense| ids.contains(&expense.category_id))
            .count()
    }

    fn scope_filter(&self, scope: Option<&str>) -> Option<HashSet<CategoryId>> {
        scope.map(|path| self.categories.subtree_ids(path))
    }

    fn expenses_in<'a>(
        &'a self,
        range: DateRange,
        scope: Option<&str>,
    ) -> impl Iterator<Item = &'a Expense> + 'a {
        let filter = self.scope_filter(scope);
        self.expenses.rows.iter().filter(move |expense| {
            range.contains(expense.date)
                && filter
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&expense.category_id))
        })
    }

    fn add_expense(
        &mut self,
        category_id: CategoryId,
        amount: Amount,
        date: NaiveDate,
        note: &str,
    ) -> StoreResult<ExpenseId> {
        if !self.categories.rows.contains_key(&category_id) {
            return Err(StoreError::NotFound(category_id));
        }
        let id = self.expenses.next_id;
        self.expenses.next_id += 1;
        self.expenses
            .rows
            .push(Expense::new(id, category_id, amount, date).with_note(note));
        Ok(id)
    }

    fn reassign_expenses(&mut self, from_scope: &str, to: CategoryId) -> StoreResult<usize> {
        if !self.categories.rows.contains_key(&to) {
            return Err(StoreError::NotFound(to));
        }
        let ids = self.categories.subtree_ids(from_scope);
        let mut moved = 0;
        for expense in self
            .expenses
            .rows
            .iter_mut()
            .filter(|expense| ids.contains(&expense.category_id))
        {
            expense.category_id = to;
            moved += 1;
        }
        Ok(moved)
    }
}

impl CategoryReader for StoreState {
    fn get_by_id(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        self.categories.get_by_id(id)
    }

    fn get_by_full_path(&self, full_path: &str) -> StoreResult<Option<Category>> {
        self.categories.get_by_full_path(full_path)
    }

    fn get_children(&self, parent_id: Option<CategoryId>) -> StoreResult<Vec<Category>> {
        self.categories.get_children(parent_id)
    }

    fn get_descendants_by_prefix(&self, full_path: &str) -> StoreResult<Vec<Category>> {
        self.categories.get_descendants_by_prefix(full_path)
    }

    fn get_root_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        self.categories.get_root_by_name(name)
    }

    fn all(&self) -> StoreResult<Vec<Category>> {
        self.categories.all()
    }
}

/// Transactions write categories but see the expense table of the same
/// staged state, so expense checks and deletes share one write lock.
impl CategoryWriter for StoreState {
    fn insert(&mut self, record: NewCategory) -> StoreResult<CategoryId> {
        self.categories.insert(record)
    }

    fn update(&mut self, category: &Category) -> StoreResult<()> {
        self.categories.update(category)
    }

    fn delete(&mut self, id: CategoryId) -> StoreResult<()> {
        self.categories.delete(id)
    }

    fn count_expenses_in_scope(&self, full_path: &str) -> StoreResult<usize> {
        Ok(self.count_in_scope(full_path))
    }
}

/// Thread-safe store. Readers see one consistent state per call; writers
/// stage a copy and swap it in on success.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    sink: Option<Box<dyn PersistSink>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("state", &self.state)
            .field("sink", &self.sink.as_ref().map(|_| "<dyn PersistSink>"))
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
            sink: None,
        }
    }

    /// Store whose commits are written through `sink` before becoming visible.
    pub fn with_sink(state: StoreState, sink: Box<dyn PersistSink>) -> Self {
        Self {
            state: RwLock::new(state),
            sink: Some(sink),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn commit<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(&mut StoreState) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut guard = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let mut staged = guard.clone();
        let value = op(&mut staged)?;
        if let Some(sink) = &self.sink {
            sink.persist(&staged)?;
        }
        *guard = staged;
        Ok(value)
    }

    /// Records an expense against an existing category.
    pub fn add_expense(
        &self,
        category_id: CategoryId,
        amount: Amount,
        date: NaiveDate,
        note: &str,
    ) -> StoreResult<ExpenseId> {
        self.commit(|state| state.add_expense(category_id, amount, date, note))
    }

    /// Repoints every expense in the `from_scope` subtree to `to`. This is
    /// the first half of the reassign-then-delete workflow.
    pub fn reassign_expenses(&self, from_scope: &str, to: CategoryId) -> StoreResult<usize> {
        let moved = self.commit(|state| state.reassign_expenses(from_scope, to))?;
        debug!(from_scope, to, moved, "expenses reassigned");
        Ok(moved)
    }

    pub fn expenses(&self) -> StoreResult<Vec<Expense>> {
        Ok(self.read()?.expenses.rows.clone())
    }

    pub fn snapshot(&self) -> StoreResult<StoreState> {
        Ok(self.read()?.clone())
    }
}

impl CategoryReader for MemoryStore {
    fn get_by_id(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        self.read()?.categories.get_by_id(id)
    }

    fn get_by_full_path(&self, full_path: &str) -> StoreResult<Option<Category>> {
        self.read()?.categories.get_by_full_path(full_path)
    }

    fn get_children(&self, parent_id: Option<CategoryId>) -> StoreResult<Vec<Category>> {
        self.read()?.categories.get_children(parent_id)
    }

    fn get_descendants_by_prefix(&self, full_path: &str) -> StoreResult<Vec<Category>> {
        self.read()?.categories.get_descendants_by_prefix(full_path)
    }

    fn get_root_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        self.read()?.categories.get_root_by_name(name)
    }

    fn all(&self) -> StoreResult<Vec<Category>> {
        self.read()?.categories.all()
    }
}

impl CategoryStore for MemoryStore {
    fn transaction<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn CategoryWriter) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.commit(|state| op(state))
    }
}

impl ExpenseStore for MemoryStore {
    fn count_by_category_or_descendants(&self, full_path: &str) -> StoreResult<usize> {
        Ok(self.read()?.count_in_scope(full_path))
    }

    fn sum_amount_in_range(&self, range: DateRange, scope: Option<&str>) -> StoreResult<Amount> {
        let state = self.read()?;
        let total = state.expenses_in(range, scope).map(|expense| expense.amount).sum();
        Ok(total)
    }

    fn daily_sums(
        &self,
        range: DateRange,
        scope: Option<&str>,
    ) -> StoreResult<BTreeMap<NaiveDate, Amount>> {
        let state = self.read()?;
        let mut sums = BTreeMap::new();
        for expense in state.expenses_in(range, scope) {
            *sums.entry(expense.date).or_insert(0) += expense.amount;
        }
        Ok(sums)
    }

    fn total_in_range(&self, range: DateRange) -> StoreResult<Amount> {
        self.sum_amount_in_range(range, None)
    }

    fn spend_snapshot(&self, range: DateRange) -> StoreResult<SpendSnapshot> {
        let state = self.read()?;
        let mut grouped: BTreeMap<CategoryId, CategorySpend> = BTreeMap::new();
        for expense in state.expenses_in(range, None) {
            let entry = grouped
                .entry(expense.category_id)
                .or_insert(CategorySpend {
                    category_id: expense.category_id,
                    amount: 0,
                    count: 0,
                });
            entry.amount += expense.amount;
            entry.count += 1;
        }
        Ok(SpendSnapshot {
            categories: state.categories.all()?,
            spends: grouped.into_values().collect(),
        })
    }
}

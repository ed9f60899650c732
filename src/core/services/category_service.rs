//! Business logic for the category hierarchy.
//!
//! Every mutation runs inside one store transaction: a rename or move
//! rewrites the target and every descendant path together, and a cascading
//! delete removes leaves before their parents.

use tracing::{info, warn};

use crate::domain::{
    category::{join_path, path_depth, rebase_path, validate_name},
    Category, CategoryId, DeleteCheck, NewCategory, MAX_DEPTH,
};
use crate::seed::SeedCategory;
use crate::storage::{CategoryReader, CategoryStore, CategoryWriter, ExpenseStore};

use super::{ServiceError, ServiceResult};

/// Result of the first phase of a delete: the pre-check plus the
/// categories that may receive the doomed subtree's expenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePlan {
    pub category: Option<Category>,
    pub check: DeleteCheck,
    pub reassignment_targets: Vec<Category>,
}

/// Provides validated operations over the category tree.
///
/// See also: [`crate::core::services::PathResolver`] for building chains from
/// `"A > B > C"` strings.
pub struct CategoryService<'a, C, E> {
    categories: &'a C,
    expenses: &'a E,
}

impl<'a, C, E> CategoryService<'a, C, E>
where
    C: CategoryStore,
    E: ExpenseStore,
{
    pub fn new(categories: &'a C, expenses: &'a E) -> Self {
        Self {
            categories,
            expenses,
        }
    }

    /// Creates a category under `parent_id` (or at the root) and returns its id.
    pub fn insert(
        &self,
        name: &str,
        icon: &str,
        parent_id: Option<CategoryId>,
    ) -> ServiceResult<CategoryId> {
        let name = validate_name(name).map_err(|err| ServiceError::from_name(name, err))?;
        let (id, full_path) = self.categories.transaction(|tx| {
            let full_path = child_path(tx, name, parent_id)?;
            let id = tx.insert(NewCategory {
                id: None,
                name: name.to_string(),
                icon: icon.to_string(),
                parent_id,
                full_path: full_path.clone(),
            })?;
            Ok::<_, ServiceError>((id, full_path))
        })?;
        info!(id, path = %full_path, "category inserted");
        Ok(id)
    }

    /// Renames, re-icons, and/or moves a category. When the name or parent
    /// changes, every descendant path is rewritten in the same transaction.
    pub fn update(
        &self,
        id: CategoryId,
        name: &str,
        icon: &str,
        parent_id: Option<CategoryId>,
    ) -> ServiceResult<()> {
        let name = validate_name(name).map_err(|err| ServiceError::from_name(name, err))?;
        let outcome = self.categories.transaction(|tx| {
            let current = tx
                .get_by_id(id)?
                .ok_or(ServiceError::CategoryNotFound(id))?;

            if current.name == name && current.parent_id == parent_id {
                let updated = Category {
                    icon: icon.to_string(),
                    ..current
                };
                tx.update(&updated)?;
                return Ok::<_, ServiceError>(None);
            }

            if let Some(parent_id) = parent_id {
                ensure_not_own_descendant(tx, &current, parent_id)?;
            }
            let new_path = child_path(tx, name, parent_id)?;
            let descendants = tx.get_descendants_by_prefix(&current.full_path)?;

            let mut rewritten = Vec::with_capacity(descendants.len());
            for descendant in descendants {
                let Some(path) = rebase_path(&descendant.full_path, &current.full_path, &new_path)
                else {
                    continue;
                };
                let depth = path_depth(&path);
                if depth > MAX_DEPTH {
                    return Err(ServiceError::DepthExceeded {
                        path,
                        depth,
                        max: MAX_DEPTH,
                    });
                }
                rewritten.push(Category {
                    full_path: path,
                    ..descendant
                });
            }

            let old_path = current.full_path.clone();
            tx.update(&Category {
                name: name.to_string(),
                icon: icon.to_string(),
                parent_id,
                full_path: new_path.clone(),
                ..current
            })?;
            for descendant in &rewritten {
                tx.update(descendant)?;
            }
            Ok(Some((old_path, new_path, rewritten.len())))
        })?;

        match outcome {
            Some((from, to, descendants)) => {
                info!(id, %from, %to, descendants, "category path rewritten")
            }
            None => info!(id, "category icon updated"),
        }
        Ok(())
    }

    /// Lists every category that may become the new parent of `id`: not the
    /// category itself, not one of its descendants, and shallow enough that
    /// the moved subtree stays within the depth limit.
    pub fn parent_candidates(&self, id: CategoryId) -> ServiceResult<Vec<Category>> {
        let all = self.categories.all()?;
        let target = all
            .iter()
            .find(|category| category.id == id)
            .cloned()
            .ok_or(ServiceError::CategoryNotFound(id))?;
        let height = subtree_height(&target, &all);
        let mut candidates: Vec<Category> = all
            .into_iter()
            .filter(|candidate| {
                candidate.id != target.id
                    && !target.is_ancestor_of(candidate)
                    && candidate.depth() + height <= MAX_DEPTH
            })
            .collect();
        candidates.sort_by(|a, b| a.full_path.cmp(&b.full_path));
        Ok(candidates)
    }

    /// Pre-checks a delete. Expenses anywhere in the subtree win over children.
    pub fn validate_delete(&self, id: CategoryId) -> ServiceResult<DeleteCheck> {
        let Some(category) = self.categories.get_by_id(id)? else {
            return Ok(DeleteCheck::NotFound);
        };
        let expense_count = self
            .expenses
            .count_by_category_or_descendants(&category.full_path)?;
        let child_count = self.categories.get_children(Some(id))?.len();
        let check = if expense_count > 0 {
            DeleteCheck::HasExpenses {
                expense_count,
                has_children: child_count > 0,
            }
        } else if child_count > 0 {
            DeleteCheck::HasChildren { child_count }
        } else {
            DeleteCheck::CanDelete
        };
        Ok(check)
    }

    /// First phase of the two-phase delete.
    pub fn request_delete(&self, id: CategoryId) -> ServiceResult<DeletePlan> {
        let check = self.validate_delete(id)?;
        let category = self.categories.get_by_id(id)?;
        let reassignment_targets = match &category {
            Some(doomed) => self
                .tree()?
                .into_iter()
                .filter(|candidate| candidate.id != doomed.id && !doomed.is_ancestor_of(candidate))
                .collect(),
            None => Vec::new(),
        };
        Ok(DeletePlan {
            category,
            check,
            reassignment_targets,
        })
    }

    /// Second phase of the two-phase delete.
    pub fn confirm_delete(&self, id: CategoryId) -> ServiceResult<()> {
        self.delete(id)
    }

    /// Deletes a category and its whole subtree, leaves first. Fails with
    /// [`ServiceError::HasExpenses`] if any expense still points into the
    /// subtree; the count is taken inside the deleting transaction.
    pub fn delete(&self, id: CategoryId) -> ServiceResult<()> {
        let outcome: ServiceResult<(String, usize)> = self.categories.transaction(|tx| {
            let target = tx
                .get_by_id(id)?
                .ok_or(ServiceError::CategoryNotFound(id))?;
            let count = tx.count_expenses_in_scope(&target.full_path)?;
            if count > 0 {
                return Err(ServiceError::HasExpenses { count });
            }
            let descendants = deletion_order(tx.get_descendants_by_prefix(&target.full_path)?);
            for descendant in &descendants {
                tx.delete(descendant.id)?;
            }
            tx.delete(target.id)?;
            Ok((target.full_path, descendants.len() + 1))
        });

        match outcome {
            Ok((path, removed)) => {
                info!(id, %path, removed, "category deleted");
                Ok(())
            }
            Err(ServiceError::HasExpenses { count }) => {
                warn!(id, count, "delete refused, expenses remain");
                Err(ServiceError::HasExpenses { count })
            }
            Err(err) => Err(err),
        }
    }

    /// All categories ordered by full path, i.e. depth-first tree order.
    pub fn tree(&self) -> ServiceResult<Vec<Category>> {
        let mut all = self.categories.all()?;
        all.sort_by(|a, b| a.full_path.cmp(&b.full_path));
        Ok(all)
    }

    /// Installs seed rows with their fixed ids. Does nothing unless the
    /// store is empty. Rows must list parents before children.
    pub fn install_seed(&self, seed: &[SeedCategory]) -> ServiceResult<usize> {
        if !self.categories.all()?.is_empty() {
            return Ok(0);
        }
        let installed = self.categories.transaction(|tx| {
            for row in seed {
                let name =
                    validate_name(row.name).map_err(|err| ServiceError::from_name(row.name, err))?;
                let full_path = child_path(tx, name, row.parent_id)?;
                tx.insert(NewCategory {
                    id: Some(row.id),
                    name: name.to_string(),
                    icon: row.icon.to_string(),
                    parent_id: row.parent_id,
                    full_path,
                })?;
            }
            Ok::<_, ServiceError>(seed.len())
        })?;
        info!(installed, "seed categories installed");
        Ok(installed)
    }
}

/// Path for a child called `name` under `parent_id`, checked against the
/// depth limit.
fn child_path(
    tx: &dyn CategoryWriter,
    name: &str,
    parent_id: Option<CategoryId>,
) -> ServiceResult<String> {
    let parent_path = match parent_id {
        Some(parent_id) => Some(
            tx.get_by_id(parent_id)?
                .ok_or(ServiceError::ParentNotFound(parent_id))?
                .full_path,
        ),
        None => None,
    };
    let full_path = join_path(parent_path.as_deref(), name);
    let depth = path_depth(&full_path);
    if depth > MAX_DEPTH {
        return Err(ServiceError::DepthExceeded {
            path: full_path,
            depth,
            max: MAX_DEPTH,
        });
    }
    Ok(full_path)
}

fn ensure_not_own_descendant(
    tx: &dyn CategoryWriter,
    current: &Category,
    parent_id: CategoryId,
) -> ServiceResult<()> {
    let invalid = ServiceError::InvalidParent {
        id: current.id,
        parent_id,
    };
    if parent_id == current.id {
        return Err(invalid);
    }
    match tx.get_by_id(parent_id)? {
        Some(parent) if current.is_ancestor_of(&parent) => Err(invalid),
        Some(_) => Ok(()),
        None => Err(ServiceError::ParentNotFound(parent_id)),
    }
}

/// Levels occupied by `root` and everything below it (1 for a leaf).
fn subtree_height(root: &Category, all: &[Category]) -> usize {
    let deepest = all
        .iter()
        .filter(|category| root.is_ancestor_of(category))
        .map(Category::depth)
        .max()
        .unwrap_or(root.depth());
    deepest - root.depth() + 1
}

/// Orders rows so that every category comes before its parent.
pub(crate) fn deletion_order(mut rows: Vec<Category>) -> Vec<Category> {
    rows.sort_by(|a, b| b.depth().cmp(&a.depth()).then(a.id.cmp(&b.id)));
    rows
}

//! Domain types representing hierarchical expense categories.
//!
//! Every category carries a materialized `full_path`: the names of its
//! ancestors and itself joined by [`PATH_SEPARATOR`]. Subtree queries are
//! plain prefix tests on that string.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::common::*;

/// Separator placed between path segments.
pub const PATH_SEPARATOR: &str = " > ";

/// Maximum number of segments in a category path.
pub const MAX_DEPTH: usize = 3;

/// Characters that collide with the separator or with prefix matching.
pub const FORBIDDEN_NAME_CHARS: [char; 3] = ['>', '%', '_'];

/// A node of the category tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    pub full_path: String,
}

impl Category {
    /// Number of segments in the full path; roots have depth 1.
    pub fn depth(&self) -> usize {
        path_depth(&self.full_path)
    }

    /// Returns `true` when `other` sits strictly below this category.
    pub fn is_ancestor_of(&self, other: &Category) -> bool {
        other.full_path.starts_with(&descendant_prefix(&self.full_path))
    }
}

/// Record handed to the store on insert. `id` is `None` unless the caller
/// needs a fixed identifier (seed data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub id: Option<CategoryId>,
    pub name: String,
    pub icon: String,
    pub parent_id: Option<CategoryId>,
    pub full_path: String,
}

/// Outcome of a delete pre-check. Conflicts are values, not errors, so the
/// caller can branch into a reassignment flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteCheck {
    CanDelete,
    HasChildren { child_count: usize },
    HasExpenses { expense_count: usize, has_children: bool },
    NotFound,
}

impl DeleteCheck {
    pub fn can_delete(&self) -> bool {
        matches!(self, DeleteCheck::CanDelete)
    }
}

impl fmt::Display for DeleteCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteCheck::CanDelete => f.write_str("can be deleted"),
            DeleteCheck::HasChildren { child_count } => {
                write!(f, "has {child_count} subcategories")
            }
            DeleteCheck::HasExpenses {
                expense_count,
                has_children,
            } => {
                write!(f, "has {expense_count} expenses")?;
                if *has_children {
                    f.write_str(" across its subcategories")?;
                }
                Ok(())
            }
            DeleteCheck::NotFound => f.write_str("not found"),
        }
    }
}

/// Reasons a category name is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name is blank")]
    Blank,
    #[error("name contains forbidden character `{0}`")]
    ForbiddenChar(char),
}

/// Trims the candidate and checks it against the forbidden character set.
pub fn validate_name(candidate: &str) -> Result<&str, NameError> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return Err(NameError::Blank);
    }
    match trimmed.chars().find(|ch| FORBIDDEN_NAME_CHARS.contains(ch)) {
        Some(ch) => Err(NameError::ForbiddenChar(ch)),
        None => Ok(trimmed),
    }
}

pub fn join_path(parent_path: Option<&str>, name: &str) -> String {
    match parent_path {
        Some(parent) => format!("{parent}{PATH_SEPARATOR}{name}"),
        None => name.to_string(),
    }
}

pub fn split_path(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR).collect()
}

pub fn path_depth(path: &str) -> usize {
    path.matches(PATH_SEPARATOR).count() + 1
}

/// Prefix shared by every strict descendant of `path`.
pub fn descendant_prefix(path: &str) -> String {
    format!("{path}{PATH_SEPARATOR}")
}

/// `true` when `path` is `scope` itself or lies below it.
pub fn in_subtree(path: &str, scope: &str) -> bool {
    path == scope
        || (path.len() > scope.len()
            && path.starts_with(scope)
            && path[scope.len()..].starts_with(PATH_SEPARATOR))
}

/// Replaces the `old_root` prefix of a descendant path with `new_root`,
/// keeping the remainder verbatim. Returns `None` for paths outside the
/// subtree.
pub fn rebase_path(path: &str, old_root: &str, new_root: &str) -> Option<String> {
    let prefix = descendant_prefix(old_root);
    path.strip_prefix(&prefix)
        .map(|rest| format!("{}{}", descendant_prefix(new_root), rest))
}

/// Path of the ancestor of `path` that sits one level below `scope`
/// (or at the root when `scope` is `None`). Returns `None` when `path`
/// is not strictly inside `scope`.
pub fn level_ancestor(path: &str, scope: Option<&str>) -> Option<String> {
    match scope {
        None => split_path(path).first().map(|root| root.to_string()),
        Some(scope) => {
            let prefix = descendant_prefix(scope);
            let rest = path.strip_prefix(&prefix)?;
            let child = rest.split(PATH_SEPARATOR).next()?;
            Some(format!("{prefix}{child}"))
        }
    }
}

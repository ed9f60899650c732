//! Canonical path → icon lookup consulted when categories are created from
//! bare path strings.

use std::collections::HashMap;

use crate::domain::category::join_path;
use crate::seed::{SeedCategory, DEFAULT_CATEGORIES};

/// Icon used for unknown root-level paths.
pub const DEFAULT_ICON: &str = "category";

#[derive(Debug, Clone)]
pub struct IconTable {
    by_path: HashMap<String, &'static str>,
    default_icon: &'static str,
}

impl IconTable {
    /// Table covering every path of the default hierarchy.
    pub fn canonical() -> Self {
        Self::from_seed(DEFAULT_CATEGORIES)
    }

    pub fn from_seed(rows: &[SeedCategory]) -> Self {
        let mut paths: HashMap<_, String> = HashMap::new();
        let mut by_path = HashMap::new();
        for row in rows {
            let parent_path = row
                .parent_id
                .and_then(|parent| paths.get(&parent))
                .map(String::as_str);
            let path = join_path(parent_path, row.name);
            by_path.insert(path.clone(), row.icon);
            paths.insert(row.id, path);
        }
        Self {
            by_path,
            default_icon: DEFAULT_ICON,
        }
    }

    pub fn lookup(&self, full_path: &str) -> Option<&'static str> {
        self.by_path.get(full_path).copied()
    }

    pub fn default_icon(&self) -> &'static str {
        self.default_icon
    }
}

impl Default for IconTable {
    fn default() -> Self {
        Self::canonical()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::{
    core::utils::ensure_dir,
    domain::{
        category::{join_path, path_depth},
        Category, Expense, MAX_DEPTH,
    },
};

use super::{
    memory::{CategoryTable, ExpenseTable},
    MemoryStore, PersistSink, StoreError, StoreResult, StoreState,
};

const TMP_SUFFIX: &str = "tmp";

pub const STORE_SCHEMA_VERSION: u32 = 1;

/// On-disk representation of a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub categories: Vec<Category>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl StoreSnapshot {
    pub fn capture(state: &StoreState) -> Self {
        Self {
            schema_version: STORE_SCHEMA_VERSION,
            saved_at: Utc::now(),
            categories: state.categories.rows().cloned().collect(),
            expenses: state.expenses.rows().to_vec(),
        }
    }

    pub fn into_state(self) -> StoreState {
        StoreState {
            categories: CategoryTable::from_rows(self.categories),
            expenses: ExpenseTable::from_rows(self.expenses),
        }
    }
}

/// JSON file persistence for a [`MemoryStore`]. Each committed write
/// rewrites the file through a temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the file (or starts empty when it does not exist yet) and
    /// returns a store that writes through to it.
    pub fn open(self) -> StoreResult<MemoryStore> {
        let state = if self.path.exists() {
            let snapshot = load_snapshot_from_path(&self.path)?;
            let state = snapshot.into_state();
            for warning in store_warnings(&state) {
                warn!(path = %self.path.display(), "{warning}");
            }
            info!(
                path = %self.path.display(),
                categories = state.categories.len(),
                expenses = state.expenses.rows().len(),
                "store loaded"
            );
            state
        } else {
            StoreState::default()
        };
        Ok(MemoryStore::with_sink(state, Box::new(self)))
    }
}

impl PersistSink for JsonStorage {
    fn persist(&self, state: &StoreState) -> StoreResult<()> {
        save_snapshot_to_path(&StoreSnapshot::capture(state), &self.path)
    }
}

pub fn save_snapshot_to_path(snapshot: &StoreSnapshot, path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_snapshot_from_path(path: &Path) -> StoreResult<StoreSnapshot> {
    let data = fs::read_to_string(path)?;
    let snapshot: StoreSnapshot = serde_json::from_str(&data)?;
    if snapshot.schema_version > STORE_SCHEMA_VERSION {
        return Err(StoreError::Schema(snapshot.schema_version));
    }
    Ok(snapshot)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

/// Detects dangling references and path drift within a loaded snapshot.
pub fn store_warnings(state: &StoreState) -> Vec<String> {
    let category_ids: HashSet<_> = state.categories.rows().map(|c| c.id).collect();
    let mut warnings = Vec::new();

    for category in state.categories.rows() {
        let parent_path = match category.parent_id {
            Some(parent_id) => match state.categories.rows().find(|c| c.id == parent_id) {
                Some(parent) => Some(parent.full_path.as_str()),
                None => {
                    warnings.push(format!(
                        "category {} references missing parent {}",
                        category.id, parent_id
                    ));
                    continue;
                }
            },
            None => None,
        };
        let expected = join_path(parent_path, &category.name);
        if category.full_path != expected {
            warnings.push(format!(
                "category {} has path `{}`, expected `{}`",
                category.id, category.full_path, expected
            ));
        }
        if path_depth(&category.full_path) > MAX_DEPTH {
            warnings.push(format!(
                "category {} exceeds maximum depth {}",
                category.id, MAX_DEPTH
            ));
        }
    }

    for expense in state.expenses.rows() {
        if !category_ids.contains(&expense.category_id) {
            warnings.push(format!(
                "expense {} references missing category {}",
                expense.id, expense.category_id
            ));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;
    use crate::domain::NewCategory;
    use crate::storage::{CategoryReader, CategoryStore, CategoryWriter, ExpenseStore};

    fn food() -> NewCategory {
        NewCategory {
            id: None,
            name: "Food".into(),
            icon: "restaurant".into(),
            parent_id: None,
            full_path: "Food".into(),
        }
    }

    #[test]
    fn committed_writes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonStorage::new(&path).open().unwrap();
        let id = store.transaction(|tx| tx.insert(food())).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        store.add_expense(id, 1250, date, "market").unwrap();
        drop(store);

        let reopened = JsonStorage::new(&path).open().unwrap();
        let category = reopened.get_by_full_path("Food").unwrap().unwrap();
        assert_eq!(category.id, id);
        assert_eq!(reopened.count_by_category_or_descendants("Food").unwrap(), 1);
    }

    #[test]
    fn rejected_transaction_does_not_touch_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonStorage::new(&path).open().unwrap();
        store.transaction(|tx| tx.insert(food())).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let result = store.transaction(|tx| tx.insert(food()));
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut snapshot = StoreSnapshot::capture(&StoreState::default());
        snapshot.schema_version = STORE_SCHEMA_VERSION + 1;
        save_snapshot_to_path(&snapshot, &path).unwrap();

        let err = JsonStorage::new(&path).open().unwrap_err();
        assert!(matches!(err, StoreError::Schema(_)));
    }

    #[test]
    fn warnings_flag_path_drift() {
        let mut state = StoreState::default();
        state
            .insert(NewCategory {
                full_path: "Meals".into(),
                ..food()
            })
            .unwrap();
        let warnings = store_warnings(&state);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("expected `Food`"));
    }
}

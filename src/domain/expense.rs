use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::category::Category;
use crate::domain::common::{Amount, CategoryId, ExpenseId};

/// A single spending record. The engine only reads these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Expense {
    pub id: ExpenseId,
    pub category_id: CategoryId,
    pub amount: Amount,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

impl Expense {
    pub fn new(id: ExpenseId, category_id: CategoryId, amount: Amount, date: NaiveDate) -> Self {
        Self {
            id,
            category_id,
            amount,
            date,
            note: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// Per-category spend within a date range, as reported by the expense store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySpend {
    pub category_id: CategoryId,
    pub amount: Amount,
    pub count: usize,
}

/// Category rows and the spends booked against them, taken together so
/// every `CategorySpend` resolves against the same tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpendSnapshot {
    pub categories: Vec<Category>,
    pub spends: Vec<CategorySpend>,
}

//! Computed (never persisted) stats rows.

use serde::{Deserialize, Serialize};

use crate::domain::common::{Amount, CategoryId};

/// Identifier of the synthetic row that folds everything past the top-N cut.
pub const OTHER_CATEGORY_ID: CategoryId = -1;
pub const OTHER_CATEGORY_NAME: &str = "Other";
pub const OTHER_ICON: &str = "more_horiz";

/// Number of ranked rows kept before the remainder is collapsed.
pub const BREAKDOWN_LIMIT: usize = 10;

/// One row of a breakdown: a category and its whole subtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category_id: CategoryId,
    pub category_name: String,
    pub full_path: String,
    pub icon: String,
    pub total_amount: Amount,
    pub expense_count: usize,
    pub has_children: bool,
}

impl CategoryTotal {
    pub fn is_other(&self) -> bool {
        self.category_id == OTHER_CATEGORY_ID
    }

    /// Only real categories with children can be drilled into.
    pub fn is_drillable(&self) -> bool {
        !self.is_other() && self.has_children
    }

    pub(crate) fn other(total_amount: Amount, expense_count: usize) -> Self {
        Self {
            category_id: OTHER_CATEGORY_ID,
            category_name: OTHER_CATEGORY_NAME.to_string(),
            full_path: OTHER_CATEGORY_NAME.to_string(),
            icon: OTHER_ICON.to_string(),
            total_amount,
            expense_count,
            has_children: false,
        }
    }
}

/// Navigation context pushed on each drill-down step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrillDownLevel {
    pub parent_path: String,
    pub title: String,
}

/// One histogram bucket (a day or a month).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistogramBin {
    pub label: String,
    pub amount: Amount,
}

/// Bucket width used for a histogram.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BinGranularity {
    Daily,
    Monthly,
}

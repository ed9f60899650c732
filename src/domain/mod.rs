//! Pure domain models (Category, Expense, stats rows, date ranges).
//! No I/O, no CLI, no storage.

pub mod category;
pub mod common;
pub mod expense;
pub mod stats;

pub use category::{Category, DeleteCheck, NewCategory, MAX_DEPTH, PATH_SEPARATOR};
pub use common::{Amount, CategoryId, DateRange, DateRangeError, ExpenseId, StatsPeriod};
pub use expense::{CategorySpend, Expense, SpendSnapshot};
pub use stats::{BinGranularity, CategoryTotal, DrillDownLevel, HistogramBin, OTHER_CATEGORY_ID};

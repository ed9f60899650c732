//! Stats aggregation: breakdown rows, range totals, and histogram input.
//!
//! Every call recomputes from the expense store. Nothing is cached.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{
    category::level_ancestor,
    stats::BREAKDOWN_LIMIT,
    Amount, Category, CategoryId, CategoryTotal, DateRange, HistogramBin, StatsPeriod,
};
use crate::storage::ExpenseStore;

use super::{histogram::compute_histogram_bins, ServiceError, ServiceResult};

/// Everything one stats screen shows for a `(scope, range)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsView {
    pub breakdown: Vec<CategoryTotal>,
    pub grand_total: Amount,
    pub bins: Vec<HistogramBin>,
}

/// Category paths are read from the expense store's spend snapshot, so a
/// breakdown never pairs spends with a different version of the tree.
pub struct StatsService<'a, E> {
    expenses: &'a E,
}

impl<'a, E> StatsService<'a, E>
where
    E: ExpenseStore,
{
    pub fn new(expenses: &'a E) -> Self {
        Self { expenses }
    }

    /// Top-ranked rows for `scope` (the roots when `None`), with anything
    /// past [`BREAKDOWN_LIMIT`] folded into one `Other` row.
    pub fn get_category_breakdown(
        &self,
        scope: Option<&str>,
        range: DateRange,
    ) -> ServiceResult<Vec<CategoryTotal>> {
        let ranked = self.ranked_totals(scope, range)?;
        Ok(collapse_other(ranked, BREAKDOWN_LIMIT))
    }

    /// Every row for `scope`, ranked, before any `Other` collapsing.
    pub fn ranked_totals(
        &self,
        scope: Option<&str>,
        range: DateRange,
    ) -> ServiceResult<Vec<CategoryTotal>> {
        let snapshot = self.expenses.spend_snapshot(range)?;
        let categories = &snapshot.categories;

        let by_id: HashMap<CategoryId, &Category> =
            categories.iter().map(|category| (category.id, category)).collect();
        let by_path: HashMap<&str, &Category> = categories
            .iter()
            .map(|category| (category.full_path.as_str(), category))
            .collect();
        let parents: HashSet<CategoryId> =
            categories.iter().filter_map(|category| category.parent_id).collect();

        let mut grouped: BTreeMap<String, (Amount, usize)> = BTreeMap::new();
        for spend in &snapshot.spends {
            let category = by_id
                .get(&spend.category_id)
                .ok_or(ServiceError::CategoryNotFound(spend.category_id))?;
            // Outside the scope being broken down.
            let Some(key) = level_ancestor(&category.full_path, scope) else {
                continue;
            };
            let entry = grouped.entry(key).or_default();
            entry.0 += spend.amount;
            entry.1 += spend.count;
        }

        let mut rows = grouped
            .into_iter()
            .map(|(path, (total_amount, expense_count))| -> ServiceResult<CategoryTotal> {
                let category = by_path
                    .get(path.as_str())
                    .ok_or_else(|| ServiceError::PathNotFound { path: path.clone() })?;
                Ok(CategoryTotal {
                    category_id: category.id,
                    category_name: category.name.clone(),
                    full_path: path,
                    icon: category.icon.clone(),
                    total_amount,
                    expense_count,
                    has_children: parents.contains(&category.id),
                })
            })
            .collect::<ServiceResult<Vec<_>>>()?;
        rows.sort_by(|a, b| {
            b.total_amount
                .cmp(&a.total_amount)
                .then_with(|| a.category_name.cmp(&b.category_name))
        });

        debug!(
            scope = scope.unwrap_or("<root>"),
            %range,
            rows = rows.len(),
            "breakdown computed"
        );
        Ok(rows)
    }

    pub fn get_total_for_range(&self, range: DateRange) -> ServiceResult<Amount> {
        Ok(self.expenses.total_in_range(range)?)
    }

    pub fn get_daily_totals(
        &self,
        range: DateRange,
        scope: Option<&str>,
    ) -> ServiceResult<BTreeMap<NaiveDate, Amount>> {
        Ok(self.expenses.daily_sums(range, scope)?)
    }

    /// Breakdown, grand total and bins for one screen. At the root the
    /// grand total is the independent range total; inside a drill level it
    /// is the sum of the level's rows before collapsing.
    pub fn view(
        &self,
        scope: Option<&str>,
        period: StatsPeriod,
        range: DateRange,
    ) -> ServiceResult<StatsView> {
        let ranked = self.ranked_totals(scope, range)?;
        let grand_total = match scope {
            None => self.get_total_for_range(range)?,
            Some(_) => ranked.iter().map(|row| row.total_amount).sum(),
        };
        let daily = self.get_daily_totals(range, scope)?;
        let bins = compute_histogram_bins(period, range, &daily);
        Ok(StatsView {
            breakdown: collapse_other(ranked, BREAKDOWN_LIMIT),
            grand_total,
            bins,
        })
    }
}

/// Keeps the first `limit` rows and folds the rest into a single `Other`
/// row. Expects `rows` already ranked.
pub fn collapse_other(mut rows: Vec<CategoryTotal>, limit: usize) -> Vec<CategoryTotal> {
    if rows.len() <= limit {
        return rows;
    }
    let rest = rows.split_off(limit);
    let amount = rest.iter().map(|row| row.total_amount).sum();
    let count = rest.iter().map(|row| row.expense_count).sum();
    rows.push(CategoryTotal::other(amount, count));
    rows
}

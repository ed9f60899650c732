//! Stack-based navigation over the stats breakdown.
//!
//! The navigator owns the current period, anchor date and drill stack. Each
//! transition computes the next [`StatsSnapshot`] first and only then commits
//! the new position, so a failed query leaves the previous screen intact.
//! Period, month, year and custom-range changes always clear the stack.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::core::services::{ServiceError, ServiceResult, StatsService};
use crate::domain::{
    common::{shift_month, shift_year},
    Amount, CategoryTotal, DateRange, DrillDownLevel, HistogramBin, StatsPeriod,
};
use crate::storage::{CategoryReader, ExpenseStore};

/// Hands out monotonically increasing request tokens. Starting a new
/// request makes every older token stale.
#[derive(Debug, Default)]
pub struct RequestTracker {
    generation: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> RequestToken {
        RequestToken(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.0
    }
}

/// What the stats screen displays after a successful recompute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub period: StatsPeriod,
    pub range: DateRange,
    pub levels: Vec<DrillDownLevel>,
    pub breakdown: Vec<CategoryTotal>,
    pub grand_total: Amount,
    pub bins: Vec<HistogramBin>,
}

impl StatsSnapshot {
    pub fn scope(&self) -> Option<&str> {
        self.levels.last().map(|level| level.parent_path.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Position {
    period: StatsPeriod,
    anchor: NaiveDate,
    custom_range: Option<DateRange>,
    stack: Vec<DrillDownLevel>,
}

impl Position {
    fn range(&self) -> DateRange {
        match (self.period, self.custom_range) {
            (StatsPeriod::Yearly, _) => DateRange::year_of(self.anchor),
            (StatsPeriod::Custom, Some(range)) => range,
            _ => DateRange::month_of(self.anchor),
        }
    }

    fn scope(&self) -> Option<&str> {
        self.stack.last().map(|level| level.parent_path.as_str())
    }
}

pub struct DrillDownNavigator<C, E> {
    categories: Arc<C>,
    expenses: Arc<E>,
    position: Position,
    snapshot: Option<StatsSnapshot>,
    tracker: Arc<RequestTracker>,
}

impl<C, E> DrillDownNavigator<C, E>
where
    C: CategoryReader,
    E: ExpenseStore,
{
    /// Starts at the root for `period` around `anchor`. Nothing is computed
    /// until the first transition or [`refresh`](Self::refresh).
    pub fn new(
        categories: Arc<C>,
        expenses: Arc<E>,
        period: StatsPeriod,
        anchor: NaiveDate,
    ) -> Self {
        Self {
            categories,
            expenses,
            position: Position {
                period,
                anchor,
                custom_range: None,
                stack: Vec::new(),
            },
            snapshot: None,
            tracker: Arc::new(RequestTracker::new()),
        }
    }

    pub fn tracker(&self) -> Arc<RequestTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn snapshot(&self) -> Option<&StatsSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn levels(&self) -> &[DrillDownLevel] {
        &self.position.stack
    }

    pub fn period(&self) -> StatsPeriod {
        self.position.period
    }

    pub fn anchor(&self) -> NaiveDate {
        self.position.anchor
    }

    pub fn range(&self) -> DateRange {
        self.position.range()
    }

    /// Recomputes the current position without moving.
    pub fn refresh(&mut self) -> ServiceResult<bool> {
        self.go(self.position.clone())
    }

    /// Pushes `path` and narrows the breakdown to its children.
    pub fn drill_down(&mut self, path: &str, title: &str) -> ServiceResult<bool> {
        if self.categories.get_by_full_path(path)?.is_none() {
            return Err(ServiceError::PathNotFound {
                path: path.to_string(),
            });
        }
        let mut next = self.position.clone();
        next.stack.push(DrillDownLevel {
            parent_path: path.to_string(),
            title: title.to_string(),
        });
        self.go(next)
    }

    /// Drills into a breakdown row. The synthetic `Other` row is terminal.
    pub fn drill_into(&mut self, row: &CategoryTotal) -> ServiceResult<bool> {
        if row.is_other() {
            return Err(ServiceError::NotDrillable {
                name: row.category_name.clone(),
            });
        }
        self.drill_down(&row.full_path, &row.category_name)
    }

    /// Pops one level. Returns `false` without recomputing when already at
    /// the root.
    pub fn navigate_up(&mut self) -> ServiceResult<bool> {
        if self.position.stack.is_empty() {
            return Ok(false);
        }
        let mut next = self.position.clone();
        next.stack.pop();
        self.go(next)
    }

    pub fn set_period(&mut self, period: StatsPeriod) -> ServiceResult<bool> {
        let mut next = self.reset();
        next.period = period;
        self.go(next)
    }

    /// Moves the anchor by whole months and shows that month.
    pub fn navigate_month(&mut self, delta: i32) -> ServiceResult<bool> {
        let mut next = self.reset();
        next.anchor = shift_month(next.anchor, delta);
        next.period = StatsPeriod::Monthly;
        self.go(next)
    }

    /// Moves the anchor by whole years. A custom range switches to the
    /// yearly view.
    pub fn navigate_year(&mut self, delta: i32) -> ServiceResult<bool> {
        let mut next = self.reset();
        next.anchor = shift_year(next.anchor, delta);
        if next.period == StatsPeriod::Custom {
            next.period = StatsPeriod::Yearly;
        }
        self.go(next)
    }

    pub fn set_custom_range(&mut self, start: NaiveDate, end: NaiveDate) -> ServiceResult<bool> {
        let range = DateRange::new(start, end)?;
        let mut next = self.reset();
        next.period = StatsPeriod::Custom;
        next.custom_range = Some(range);
        self.go(next)
    }

    fn reset(&self) -> Position {
        Position {
            stack: Vec::new(),
            ..self.position.clone()
        }
    }

    fn go(&mut self, next: Position) -> ServiceResult<bool> {
        let (token, snapshot) = self.compute(&next)?;
        Ok(self.settle(token, next, snapshot))
    }

    fn compute(&self, position: &Position) -> ServiceResult<(RequestToken, StatsSnapshot)> {
        let token = self.tracker.begin();
        let range = position.range();
        let stats = StatsService::new(self.expenses.as_ref());
        let view = stats.view(position.scope(), position.period, range)?;
        Ok((
            token,
            StatsSnapshot {
                period: position.period,
                range,
                levels: position.stack.clone(),
                breakdown: view.breakdown,
                grand_total: view.grand_total,
                bins: view.bins,
            },
        ))
    }

    /// Applies a computed result unless a newer request has started since.
    fn settle(&mut self, token: RequestToken, next: Position, snapshot: StatsSnapshot) -> bool {
        if !self.tracker.is_current(token) {
            warn!(?token, range = %snapshot.range, "stale stats result discarded");
            return false;
        }
        debug!(
            period = %snapshot.period,
            range = %snapshot.range,
            depth = snapshot.levels.len(),
            rows = snapshot.breakdown.len(),
            grand_total = snapshot.grand_total,
            "stats snapshot applied"
        );
        self.position = next;
        self.snapshot = Some(snapshot);
        true
    }
}

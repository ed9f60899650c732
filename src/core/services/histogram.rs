//! Time bucketing for the spending histogram.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::domain::{
    common::{first_of_month, shift_month},
    Amount, BinGranularity, DateRange, HistogramBin, StatsPeriod,
};

/// Longest custom range (in days, inclusive) still drawn with daily bins.
pub const CUSTOM_DAILY_MAX_DAYS: i64 = 62;

pub fn granularity(period: StatsPeriod, range: DateRange) -> BinGranularity {
    match period {
        StatsPeriod::Monthly => BinGranularity::Daily,
        StatsPeriod::Yearly => BinGranularity::Monthly,
        StatsPeriod::Custom if range.day_count() <= CUSTOM_DAILY_MAX_DAYS => {
            BinGranularity::Daily
        }
        StatsPeriod::Custom => BinGranularity::Monthly,
    }
}

/// Buckets `daily_totals` over every day or month of `range`, emitting
/// zero-amount bins for gaps. Entries outside `range` are ignored.
pub fn compute_histogram_bins(
    period: StatsPeriod,
    range: DateRange,
    daily_totals: &BTreeMap<NaiveDate, Amount>,
) -> Vec<HistogramBin> {
    match granularity(period, range) {
        BinGranularity::Daily => range
            .days()
            .map(|day| HistogramBin {
                label: day.day().to_string(),
                amount: daily_totals.get(&day).copied().unwrap_or(0),
            })
            .collect(),
        BinGranularity::Monthly => monthly_bins(range, daily_totals),
    }
}

fn monthly_bins(range: DateRange, daily_totals: &BTreeMap<NaiveDate, Amount>) -> Vec<HistogramBin> {
    let first = first_of_month(range.start);
    let mut bins: Vec<HistogramBin> = (0..range.month_count())
        .map(|offset| HistogramBin {
            label: shift_month(first, offset as i32).format("%b").to_string(),
            amount: 0,
        })
        .collect();
    for (day, amount) in daily_totals.range(range.start..=range.end) {
        let index = (day.year() - first.year()) * 12 + day.month0() as i32 - first.month0() as i32;
        if let Some(bin) = bins.get_mut(index as usize) {
            bin.amount += amount;
        }
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    #[test]
    fn monthly_period_fills_every_day() {
        let totals = BTreeMap::from([(date(2024, 6, 1), 100), (date(2024, 6, 5), 200)]);
        let bins = compute_histogram_bins(
            StatsPeriod::Monthly,
            range(date(2024, 6, 1), date(2024, 6, 30)),
            &totals,
        );

        assert_eq!(bins.len(), 30);
        assert_eq!(bins[0].amount, 100);
        assert!(bins[1..4].iter().all(|bin| bin.amount == 0));
        assert_eq!(bins[4].amount, 200);
        assert_eq!(bins[4].label, "5");
        assert_eq!(bins.iter().map(|bin| bin.amount).sum::<Amount>(), 300);
    }

    #[test]
    fn yearly_period_uses_short_month_labels() {
        let totals = BTreeMap::from([(date(2024, 2, 29), 40), (date(2024, 12, 31), 2)]);
        let bins = compute_histogram_bins(
            StatsPeriod::Yearly,
            DateRange::year_of(date(2024, 5, 1)),
            &totals,
        );

        assert_eq!(bins.len(), 12);
        assert_eq!(bins[0].label, "Jan");
        assert_eq!(bins[1].amount, 40);
        assert_eq!(bins[11].label, "Dec");
        assert_eq!(bins[11].amount, 2);
    }

    #[test]
    fn custom_range_switches_to_months_past_sixty_two_days() {
        let start = date(2024, 1, 1);
        let daily = range(start, date(2024, 3, 2));
        let monthly = range(start, date(2024, 3, 3));
        assert_eq!(daily.day_count(), 62);

        assert_eq!(granularity(StatsPeriod::Custom, daily), BinGranularity::Daily);
        assert_eq!(granularity(StatsPeriod::Custom, monthly), BinGranularity::Monthly);
        assert_eq!(
            compute_histogram_bins(StatsPeriod::Custom, monthly, &BTreeMap::new()).len(),
            3
        );
    }

    #[test]
    fn monthly_bins_span_year_boundary() {
        let totals = BTreeMap::from([
            (date(2023, 11, 20), 5),
            (date(2024, 1, 3), 7),
            (date(2024, 4, 1), 99),
        ]);
        let bins = compute_histogram_bins(
            StatsPeriod::Custom,
            range(date(2023, 11, 15), date(2024, 2, 10)),
            &totals,
        );

        let labels: Vec<_> = bins.iter().map(|bin| bin.label.as_str()).collect();
        assert_eq!(labels, ["Nov", "Dec", "Jan", "Feb"]);
        assert_eq!(bins[0].amount, 5);
        assert_eq!(bins[2].amount, 7);
        assert_eq!(bins.iter().map(|bin| bin.amount).sum::<Amount>(), 12);
    }
}

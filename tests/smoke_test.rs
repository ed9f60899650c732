use expense_core::{
    core::services::{CategoryService, StatsService},
    domain::{DateRange, StatsPeriod},
    init,
    storage::MemoryStore,
};
use chrono::NaiveDate;

#[test]
fn engine_smoke() {
    init();

    let store = MemoryStore::new();
    let service = CategoryService::new(&store, &store);
    let food = service.insert("Food", "restaurant", None).unwrap();
    let day = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    store.add_expense(food, 4_200, day, "lunch").unwrap();

    let view = StatsService::new(&store)
        .view(None, StatsPeriod::Monthly, DateRange::month_of(day))
        .unwrap();
    assert_eq!(view.grand_total, 4_200);
    assert_eq!(view.breakdown.len(), 1);
    assert_eq!(view.bins.len(), 31);
}

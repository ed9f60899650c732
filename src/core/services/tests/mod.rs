mod category_service_tests;
mod path_resolver_tests;

use chrono::NaiveDate;

use crate::core::services::CategoryService;
use crate::domain::CategoryId;
use crate::storage::MemoryStore;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Food > Groceries > Organic, Food > Coffee, Transport.
struct Fixture {
    store: MemoryStore,
    food: CategoryId,
    groceries: CategoryId,
    organic: CategoryId,
    coffee: CategoryId,
    transport: CategoryId,
}

impl Fixture {
    fn new() -> Self {
        let store = MemoryStore::new();
        let service = CategoryService::new(&store, &store);
        let food = service.insert("Food", "restaurant", None).unwrap();
        let groceries = service.insert("Groceries", "cart", Some(food)).unwrap();
        let organic = service.insert("Organic", "eco", Some(groceries)).unwrap();
        let coffee = service.insert("Coffee", "cafe", Some(food)).unwrap();
        let transport = service.insert("Transport", "car", None).unwrap();
        Self {
            store,
            food,
            groceries,
            organic,
            coffee,
            transport,
        }
    }

    fn service(&self) -> CategoryService<'_, MemoryStore, MemoryStore> {
        CategoryService::new(&self.store, &self.store)
    }
}

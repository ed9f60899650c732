//! Default category hierarchy installed into a fresh store.
//!
//! Ids are fixed so that expenses imported against a seeded store keep
//! pointing at the same categories across installs. Parents precede their
//! children.

use crate::domain::CategoryId;

/// One row of the seed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedCategory {
    pub id: CategoryId,
    pub name: &'static str,
    pub icon: &'static str,
    pub parent_id: Option<CategoryId>,
}

const fn root(id: CategoryId, name: &'static str, icon: &'static str) -> SeedCategory {
    SeedCategory {
        id,
        name,
        icon,
        parent_id: None,
    }
}

const fn child(
    id: CategoryId,
    name: &'static str,
    icon: &'static str,
    parent: CategoryId,
) -> SeedCategory {
    SeedCategory {
        id,
        name,
        icon,
        parent_id: Some(parent),
    }
}

pub const DEFAULT_CATEGORIES: &[SeedCategory] = &[
    root(1, "Food", "restaurant"),
    child(2, "Groceries", "shopping_cart", 1),
    child(3, "Restaurants", "restaurant_menu", 1),
    child(4, "Coffee", "local_cafe", 1),
    root(5, "Transport", "directions_car"),
    child(6, "Fuel", "local_gas_station", 5),
    child(7, "Public Transit", "directions_bus", 5),
    child(8, "Taxi", "local_taxi", 5),
    root(9, "Housing", "home"),
    child(10, "Rent", "house", 9),
    child(11, "Utilities", "bolt", 9),
    child(12, "Electricity", "electric_bolt", 11),
    child(13, "Water", "water_drop", 11),
    child(14, "Internet", "wifi", 11),
    root(15, "Health", "favorite"),
    child(16, "Pharmacy", "local_pharmacy", 15),
    child(17, "Doctor", "medical_services", 15),
    root(18, "Shopping", "shopping_bag"),
    child(19, "Clothing", "checkroom", 18),
    child(20, "Electronics", "devices", 18),
    root(21, "Entertainment", "movie"),
    child(22, "Subscriptions", "subscriptions", 21),
    child(23, "Events", "event", 21),
    root(24, "Travel", "flight"),
    child(25, "Lodging", "hotel", 24),
    child(26, "Flights", "flight_takeoff", 24),
    root(27, "Education", "school"),
    root(28, "Personal Care", "spa"),
    root(29, "Gifts", "card_giftcard"),
    root(30, "Miscellaneous", "category"),
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::category::validate_name;

    #[test]
    fn parents_precede_children_and_ids_are_unique() {
        let mut seen = HashSet::new();
        for row in DEFAULT_CATEGORIES {
            if let Some(parent) = row.parent_id {
                assert!(seen.contains(&parent), "{} listed before its parent", row.name);
            }
            assert!(seen.insert(row.id), "duplicate id {}", row.id);
        }
    }

    #[test]
    fn names_are_valid() {
        for row in DEFAULT_CATEGORIES {
            assert!(validate_name(row.name).is_ok(), "{}", row.name);
        }
    }
}

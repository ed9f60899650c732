use std::collections::HashSet;
use std::thread;

use super::{date, Fixture};
use crate::core::services::{category_service::deletion_order, CategoryService, ServiceError};
use crate::domain::{category::in_subtree, DeleteCheck, MAX_DEPTH};
use crate::seed::DEFAULT_CATEGORIES;
use crate::storage::{CategoryReader, MemoryStore};

#[test]
fn fourth_level_is_rejected() {
    let store = MemoryStore::new();
    let service = CategoryService::new(&store, &store);
    let food = service.insert("Food", "restaurant", None).unwrap();
    let groceries = service.insert("Groceries", "cart", Some(food)).unwrap();
    let organic = service.insert("Organic", "eco", Some(groceries)).unwrap();

    let err = service.insert("SubOrganic", "eco", Some(organic)).unwrap_err();
    match err {
        ServiceError::DepthExceeded { path, depth, max } => {
            assert_eq!(path, "Food > Groceries > Organic > SubOrganic");
            assert_eq!(depth, 4);
            assert_eq!(max, MAX_DEPTH);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.all().unwrap().len(), 3);
}

#[test]
fn names_are_trimmed_and_validated() {
    let fx = Fixture::new();
    let id = fx.service().insert("  Books  ", "book", None).unwrap();
    assert_eq!(fx.store.get_by_id(id).unwrap().unwrap().full_path, "Books");

    for bad in ["A>B", "50%", "snake_case"] {
        let err = fx.service().insert(bad, "x", None).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidName { .. }), "{bad}");
    }
    assert!(matches!(
        fx.service().insert("   ", "x", None),
        Err(ServiceError::BlankName)
    ));
}

#[test]
fn duplicate_sibling_and_missing_parent_are_rejected() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.service().insert("Coffee", "cafe", Some(fx.food)),
        Err(ServiceError::DuplicateSibling { .. })
    ));
    // Same name under a different parent is fine.
    fx.service().insert("Coffee", "cafe", Some(fx.transport)).unwrap();
    assert!(matches!(
        fx.service().insert("Tea", "cafe", Some(999)),
        Err(ServiceError::ParentNotFound(999))
    ));
}

#[test]
fn rename_rewrites_descendant_prefixes_only() {
    let fx = Fixture::new();
    let before = fx.store.get_by_id(fx.organic).unwrap().unwrap();
    let suffix = before.full_path.strip_prefix("Food").unwrap().to_string();

    fx.service()
        .update(fx.food, "Eating", "restaurant", None)
        .unwrap();

    let after = fx.store.get_by_id(fx.organic).unwrap().unwrap();
    assert_eq!(after.full_path, format!("Eating{suffix}"));
    assert_eq!(
        fx.store.get_by_id(fx.coffee).unwrap().unwrap().full_path,
        "Eating > Coffee"
    );
    assert!(fx.store.get_by_full_path("Food > Groceries").unwrap().is_none());
}

#[test]
fn icon_change_leaves_paths_alone() {
    let fx = Fixture::new();
    fx.service()
        .update(fx.groceries, "Groceries", "shopping_basket", Some(fx.food))
        .unwrap();
    let groceries = fx.store.get_by_id(fx.groceries).unwrap().unwrap();
    assert_eq!(groceries.icon, "shopping_basket");
    assert_eq!(groceries.full_path, "Food > Groceries");
}

#[test]
fn move_is_checked_against_cycles_and_depth() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.service()
            .update(fx.food, "Food", "restaurant", Some(fx.organic)),
        Err(ServiceError::InvalidParent { .. })
    ));
    // Groceries carries a child, so under Transport > Coffee it would reach depth 4.
    let nested = fx.service().insert("Coffee", "cafe", Some(fx.transport)).unwrap();
    assert!(matches!(
        fx.service()
            .update(fx.groceries, "Groceries", "cart", Some(nested)),
        Err(ServiceError::DepthExceeded { depth: 4, .. })
    ));
    assert_eq!(
        fx.store.get_by_id(fx.organic).unwrap().unwrap().full_path,
        "Food > Groceries > Organic"
    );

    fx.service()
        .update(fx.groceries, "Groceries", "cart", Some(fx.transport))
        .unwrap();
    assert_eq!(
        fx.store.get_by_id(fx.organic).unwrap().unwrap().full_path,
        "Transport > Groceries > Organic"
    );
}

#[test]
fn parent_candidates_exclude_subtree_and_deep_nodes() {
    let fx = Fixture::new();
    let ids: Vec<_> = fx
        .service()
        .parent_candidates(fx.groceries)
        .unwrap()
        .into_iter()
        .map(|category| category.id)
        .collect();
    // Groceries spans two levels, so only roots can host it.
    assert_eq!(ids, vec![fx.food, fx.transport]);

    let leaf_targets = fx.service().parent_candidates(fx.coffee).unwrap();
    assert!(leaf_targets.iter().any(|c| c.id == fx.groceries));
    assert!(!leaf_targets.iter().any(|c| c.id == fx.organic));
}

#[test]
fn validate_delete_reports_blockers() {
    let fx = Fixture::new();
    assert_eq!(
        fx.service().validate_delete(fx.coffee).unwrap(),
        DeleteCheck::CanDelete
    );
    assert_eq!(
        fx.service().validate_delete(fx.food).unwrap(),
        DeleteCheck::HasChildren { child_count: 2 }
    );
    assert_eq!(
        fx.service().validate_delete(404).unwrap(),
        DeleteCheck::NotFound
    );

    fx.store
        .add_expense(fx.organic, 700, date(2024, 6, 2), "")
        .unwrap();
    assert_eq!(
        fx.service().validate_delete(fx.food).unwrap(),
        DeleteCheck::HasExpenses {
            expense_count: 1,
            has_children: true,
        }
    );
}

#[test]
fn delete_with_expenses_fails_until_reassigned() {
    let fx = Fixture::new();
    fx.store
        .add_expense(fx.groceries, 1_000, date(2024, 6, 2), "")
        .unwrap();
    fx.store
        .add_expense(fx.organic, 250, date(2024, 6, 3), "")
        .unwrap();

    let plan = fx.service().request_delete(fx.groceries).unwrap();
    assert!(!plan.check.can_delete());
    assert!(plan
        .reassignment_targets
        .iter()
        .all(|target| !in_subtree(&target.full_path, "Food > Groceries")));
    assert!(matches!(
        fx.service().confirm_delete(fx.groceries),
        Err(ServiceError::HasExpenses { count: 2 })
    ));

    fx.store
        .reassign_expenses("Food > Groceries", fx.coffee)
        .unwrap();
    fx.service().confirm_delete(fx.groceries).unwrap();
    assert!(fx.store.get_by_id(fx.groceries).unwrap().is_none());
    assert!(fx.store.get_by_id(fx.organic).unwrap().is_none());
    assert_eq!(fx.store.expenses().unwrap().len(), 2);
}

#[test]
fn concurrent_expense_never_outlives_deleted_category() {
    let store = MemoryStore::new();
    let service = CategoryService::new(&store, &store);
    for round in 0..500 {
        let id = service
            .insert(&format!("Round {round}"), "category", None)
            .unwrap();
        let (added, deleted) = thread::scope(|scope| {
            let adder = scope.spawn(|| store.add_expense(id, 100, date(2024, 6, 1), ""));
            let deleter = scope.spawn(|| CategoryService::new(&store, &store).delete(id));
            (adder.join().unwrap(), deleter.join().unwrap())
        });

        match (added, deleted) {
            (Ok(_), Err(ServiceError::HasExpenses { count: 1 })) => {
                assert!(store.get_by_id(id).unwrap().is_some());
            }
            (Err(_), Ok(())) => assert!(store.get_by_id(id).unwrap().is_none()),
            other => panic!("round {round}: add and delete both settled as {other:?}"),
        }
    }

    let ids: HashSet<_> = store.all().unwrap().into_iter().map(|c| c.id).collect();
    assert!(store
        .expenses()
        .unwrap()
        .iter()
        .all(|expense| ids.contains(&expense.category_id)));
}

#[test]
fn cascade_removes_children_before_parents() {
    let fx = Fixture::new();
    let rows = fx.store.get_descendants_by_prefix("Food").unwrap();
    let ordered = deletion_order(rows);
    for (index, row) in ordered.iter().enumerate() {
        let parent_position = ordered.iter().position(|other| Some(other.id) == row.parent_id);
        if let Some(parent_position) = parent_position {
            assert!(parent_position > index, "{} precedes its parent", row.full_path);
        }
    }

    fx.service().delete(fx.food).unwrap();
    let remaining: Vec<_> = fx.store.all().unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(remaining, vec![fx.transport]);
}

#[test]
fn seed_installs_once_with_fixed_ids() {
    let store = MemoryStore::new();
    let service = CategoryService::new(&store, &store);
    assert_eq!(
        service.install_seed(DEFAULT_CATEGORIES).unwrap(),
        DEFAULT_CATEGORIES.len()
    );
    assert_eq!(service.install_seed(DEFAULT_CATEGORIES).unwrap(), 0);

    let water = store.get_by_id(13).unwrap().unwrap();
    assert_eq!(water.full_path, "Housing > Utilities > Water");
    let next = service.insert("Pets", "pets", None).unwrap();
    assert_eq!(next, DEFAULT_CATEGORIES.len() as i64 + 1);
}

use super::Fixture;
use crate::core::icons::IconTable;
use crate::core::services::{PathResolver, ServiceError};
use crate::storage::{CategoryReader, MemoryStore};

#[test]
fn existing_chain_is_reused() {
    let fx = Fixture::new();
    let icons = IconTable::canonical();
    let resolver = PathResolver::new(&fx.store, &fx.store, &icons);
    let before = fx.store.all().unwrap().len();

    let organic = resolver
        .resolve_or_create_path("Food > Groceries > Organic")
        .unwrap();
    assert_eq!(organic.id, fx.organic);
    assert_eq!(fx.store.all().unwrap().len(), before);
}

#[test]
fn missing_segments_are_created_with_inherited_icons() {
    let store = MemoryStore::new();
    let icons = IconTable::canonical();
    let resolver = PathResolver::new(&store, &store, &icons);

    let leaf = resolver
        .resolve_or_create_path("  Housing >  Utilities > Gas ")
        .unwrap();
    assert_eq!(leaf.full_path, "Housing > Utilities > Gas");
    assert_eq!(leaf.depth(), 3);

    let housing = store.get_by_full_path("Housing").unwrap().unwrap();
    let utilities = store.get_by_full_path("Housing > Utilities").unwrap().unwrap();
    assert_eq!(housing.icon, "home");
    assert_eq!(utilities.icon, "bolt");
    // Not in the canonical table: falls back to the parent's icon.
    assert_eq!(leaf.icon, "bolt");
    assert_eq!(leaf.parent_id, Some(utilities.id));

    let unknown = resolver.resolve_or_create_path("Pets").unwrap();
    assert_eq!(unknown.icon, icons.default_icon());
}

#[test]
fn malformed_paths_are_rejected_before_any_insert() {
    let store = MemoryStore::new();
    let icons = IconTable::canonical();
    let resolver = PathResolver::new(&store, &store, &icons);

    assert!(matches!(
        resolver.resolve_or_create_path("Food >  > Pizza"),
        Err(ServiceError::BlankSegment { .. })
    ));
    assert!(matches!(
        resolver.resolve_or_create_path("A > B > C > D"),
        Err(ServiceError::DepthExceeded { depth: 4, .. })
    ));
    assert!(matches!(
        resolver.resolve_or_create_path("Food > Pizza_Place"),
        Err(ServiceError::InvalidName { ch: '_', .. })
    ));
    assert!(store.get_by_full_path("A").unwrap().is_none());
    assert!(store.get_by_full_path("Food").unwrap().is_none());
}

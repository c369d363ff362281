use pretty_assertions::assert_eq;

use crate::error::CascadeError;
use crate::id::ItemId;
use crate::store::IdentityStore;
use crate::view::ViewSpec;

fn store_with(values: &[&'static str]) -> IdentityStore<&'static str> {
	let mut store = IdentityStore::new();
	for value in values {
		store.add(*value).unwrap();
	}
	store
}

#[test]
fn add_assigns_increasing_ids() {
	let mut store = IdentityStore::new();
	assert_eq!(store.add("a").unwrap(), ItemId(0));
	assert_eq!(store.add("b").unwrap(), ItemId(1));
	assert_eq!(store.len(), 2);
}

#[test]
fn duplicate_add_is_rejected() {
	let mut store = store_with(&["a"]);
	assert_eq!(store.add("a"), Err(CascadeError::DuplicateValue { existing: ItemId(0) }));
	assert_eq!(store.len(), 1);
}

#[test]
fn freed_ids_are_reused() {
	let mut store = store_with(&["a", "b", "c"]);
	assert!(store.remove(&"b"));
	assert_eq!(store.add("d").unwrap(), ItemId(1));
	assert_eq!(store.add("e").unwrap(), ItemId(3));
}

#[test]
fn reused_slot_sorts_by_latest_add() {
	let mut store = store_with(&["a", "b", "c", "d"]);
	assert!(store.remove(&"b"));
	assert_eq!(store.values(), vec!["a", "c", "d"]);

	let id = store.add("e").unwrap();
	assert_eq!(id, ItemId(1));
	assert_eq!(store.ids(), vec![ItemId(0), ItemId(2), ItemId(3), ItemId(1)]);

	assert_eq!(store.set(ItemId(2), "x"), Ok("c"));
	assert!(store.remove(&"a"));
	assert_eq!(store.values(), vec!["x", "d", "e"]);
	assert_eq!(store.id_of(&"e"), Some(id));
}

#[test]
fn removing_absent_values_is_soft() {
	let mut store = store_with(&["a"]);
	assert!(!store.remove(&"z"));
	assert!(!store.remove_by_id(ItemId(7)));
	assert!(store.remove_by_id(ItemId(0)));
	assert!(!store.remove_by_id(ItemId(0)));
}

#[test]
fn add_then_remove_round_trips_snapshots() {
	let mut store = store_with(&["a", "b", "c"]);
	store.remove(&"a");
	let ids = store.ids();
	let values = store.values();

	let id = store.add("x").unwrap();
	assert!(store.remove_by_id(id));

	assert_eq!(store.ids(), ids);
	assert_eq!(store.values(), values);
}

#[test]
fn get_reports_missing_ids() {
	let store = store_with(&["a"]);
	assert_eq!(store.get(ItemId(0)), Ok(&"a"));
	assert_eq!(store.get(ItemId(3)), Err(CascadeError::ItemNotFound(ItemId(3))));
}

#[test]
fn set_keeps_identity_and_position() {
	let mut store = store_with(&["a", "b", "c"]);
	assert_eq!(store.set(ItemId(1), "z"), Ok("b"));
	assert_eq!(store.values(), vec!["a", "z", "c"]);
	assert_eq!(store.id_of(&"z"), Some(ItemId(1)));
	assert!(!store.contains(&"b"));
}

#[test]
fn set_rejects_collision_with_other_id() {
	let mut store = store_with(&["a", "b"]);
	assert_eq!(store.set(ItemId(0), "b"), Err(CascadeError::DuplicateValue { existing: ItemId(1) }));
	assert_eq!(store.set(ItemId(0), "a"), Ok("a"), "same value under the same id is allowed");
	assert_eq!(store.set(ItemId(9), "q"), Err(CascadeError::ItemNotFound(ItemId(9))));
}

#[test]
fn snapshots_are_detached() {
	let mut store = store_with(&["a", "b"]);
	let values = store.values();
	store.add("c").unwrap();
	assert_eq!(values, vec!["a", "b"]);
}

#[test]
fn root_view_keys_must_be_unique() {
	let mut store = store_with(&["a"]);
	store.add_view("all", ViewSpec::new()).unwrap();
	assert_eq!(
		store.add_view("all", ViewSpec::new()),
		Err(CascadeError::DuplicateKey { key: "all".to_string() })
	);
	assert_eq!(store.root_keys().collect::<Vec<_>>(), vec!["all"]);
}

#[test]
fn removed_root_view_handle_goes_stale() {
	let mut store = store_with(&["a"]);
	let view = store.add_view("all", ViewSpec::new()).unwrap();
	assert!(store.remove_view("all"));
	assert!(!store.remove_view("all"));
	assert_eq!(store.view(view).err(), Some(CascadeError::ViewNotFound(view)));

	let replacement = store.add_view("all", ViewSpec::new()).unwrap();
	assert_ne!(replacement, view, "a reused slot gets a new generation");
	assert!(store.view(view).is_err());
	assert_eq!(store.view(replacement).unwrap().len(), 1);
}

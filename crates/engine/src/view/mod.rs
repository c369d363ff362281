//! Filter views: live, incrementally maintained projections of a parent.
//!
//! Views live in an arena owned by the [`IdentityStore`]. Each node records
//! its parent handle (none for root views) and a keyed registry of child
//! handles. Nodes hold identities only; values are always read back through
//! the store.
//!
//! # Invariants
//!
//! - For every initialized view, its sequence holds exactly the identities of
//!   its parent's sequence (the whole store for roots) that satisfy its filter.
//! - Uninitialized views are skipped by propagation and have no children.
//! - A child is discarded only by explicit removal from its parent's registry.

mod propagate;

use std::sync::Arc;

use crate::error::{CascadeError, Result};
use crate::id::{ItemId, ViewId};
use crate::notify::{ChangeNotifier, ViewEvent};
use crate::options::InsertPolicy;
use crate::rule::{Filter, Predicate, RuleFingerprint, SortRule};
use crate::sequence::OrderedIdSequence;
use crate::store::{FxIndexMap, IdentityStore, Item};

/// Lifecycle of a view. The transition is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
	Uninitialized,
	Initialized,
}

/// Description of a view to create: filter, initial ordering and insert policy.
pub struct ViewSpec<T> {
	filter: Filter<T>,
	sort: Option<SortRule<T>>,
	insert_policy: Option<InsertPolicy>,
}

impl<T> Default for ViewSpec<T> {
	fn default() -> Self {
		Self {
			filter: Filter::all(),
			sort: None,
			insert_policy: None,
		}
	}
}

impl<T> ViewSpec<T> {
	/// Unfiltered, unsorted view using the store's insert policy.
	pub fn new() -> Self {
		Self::default()
	}

	/// Admits only values matching `pred`.
	pub fn filter(self, pred: impl Predicate<T> + 'static) -> Self {
		self.with_filter(Filter::new(pred))
	}

	pub fn with_filter(mut self, filter: Filter<T>) -> Self {
		self.filter = filter;
		self
	}

	/// Sorts the initial membership under `rule`.
	pub fn sorted_by(mut self, rule: SortRule<T>) -> Self {
		self.sort = Some(rule);
		self
	}

	/// Overrides the store's default insert policy for this view.
	pub fn insert_policy(mut self, policy: InsertPolicy) -> Self {
		self.insert_policy = Some(policy);
		self
	}
}

impl<T: Ord + 'static> ViewSpec<T> {
	/// Sorts the initial membership ascending.
	pub fn sorted(self) -> Self {
		self.sorted_by(SortRule::natural())
	}
}

pub(crate) struct ViewNode<T> {
	pub(crate) key: String,
	pub(crate) generation: u64,
	pub(crate) parent: Option<ViewId>,
	pub(crate) filter: Filter<T>,
	pub(crate) seq: OrderedIdSequence<T>,
	pub(crate) children: FxIndexMap<String, ViewId>,
	pub(crate) insert_policy: InsertPolicy,
	pub(crate) state: ViewState,
	/// Rule for the initial pass, consumed when the view initializes.
	pub(crate) initial_sort: Option<SortRule<T>>,
	pub(crate) notifier: Option<Arc<ChangeNotifier<T>>>,
}

impl<T> ViewNode<T> {
	pub(crate) fn new(key: String, generation: u64, parent: Option<ViewId>, spec: ViewSpec<T>, default_policy: InsertPolicy) -> Self {
		Self {
			key,
			generation,
			parent,
			filter: spec.filter,
			seq: OrderedIdSequence::new(),
			children: FxIndexMap::default(),
			insert_policy: spec.insert_policy.unwrap_or(default_policy),
			state: ViewState::Uninitialized,
			initial_sort: spec.sort,
			notifier: None,
		}
	}

	pub(crate) fn is_initialized(&self) -> bool {
		self.state == ViewState::Initialized
	}
}

impl<T: Item> ViewNode<T> {
	/// Emits to the attached notifier, building the event only if one exists.
	pub(crate) fn notify(&self, event: impl FnOnce() -> ViewEvent<T>) {
		if let Some(notifier) = &self.notifier {
			notifier.emit(event());
		}
	}
}

/// Read handle on one initialized view.
pub struct ViewRef<'a, T> {
	store: &'a IdentityStore<T>,
	id: ViewId,
	node: &'a ViewNode<T>,
}

impl<'a, T: Item> ViewRef<'a, T> {
	pub(crate) fn new(store: &'a IdentityStore<T>, id: ViewId, node: &'a ViewNode<T>) -> Self {
		Self { store, id, node }
	}

	pub fn id(&self) -> ViewId {
		self.id
	}

	/// Key this view is registered under in its parent.
	pub fn key(&self) -> &'a str {
		&self.node.key
	}

	/// Parent view, or `None` for a root view.
	pub fn parent(&self) -> Option<ViewId> {
		self.node.parent
	}

	pub fn len(&self) -> usize {
		self.node.seq.len()
	}

	pub fn is_empty(&self) -> bool {
		self.node.seq.is_empty()
	}

	/// Value at `index` in view order.
	pub fn get(&self, index: usize) -> Result<&'a T> {
		let id = self.id_at(index)?;
		self.store.get(id)
	}

	/// Identity at `index` in view order.
	pub fn id_at(&self, index: usize) -> Result<ItemId> {
		self.node.seq.get(index).ok_or(CascadeError::IndexOutOfRange { index, len: self.len() })
	}

	/// Identities in view order.
	pub fn ids(&self) -> &'a [ItemId] {
		self.node.seq.ids()
	}

	pub fn iter(&self) -> impl Iterator<Item = &'a T> + use<'a, T> {
		let items = &self.store.items;
		self.node.seq.ids().iter().map(move |id| &items[id.0])
	}

	/// Snapshot of the values in view order.
	pub fn to_vec(&self) -> Vec<T> {
		self.iter().cloned().collect()
	}

	/// Position of `value` in this view.
	pub fn index_of(&self, value: &T) -> Option<usize> {
		let id = self.store.id_of(value)?;
		self.node.seq.index_of(id)
	}

	pub fn index_of_id(&self, id: ItemId) -> Option<usize> {
		self.node.seq.index_of(id)
	}

	pub fn contains(&self, value: &T) -> bool {
		self.index_of(value).is_some()
	}

	pub fn child_view(&self, key: &str) -> Option<ViewId> {
		self.node.children.get(key).copied()
	}

	pub fn child_keys(&self) -> impl Iterator<Item = &'a str> + use<'a, T> {
		self.node.children.keys().map(String::as_str)
	}

	/// Whether a full sort with the last rule would be skipped.
	pub fn is_sorted_cache_valid(&self) -> bool {
		self.node.seq.is_sorted_cache_valid()
	}

	/// Fingerprint of the last full sort's rule.
	pub fn last_rule(&self) -> Option<RuleFingerprint> {
		self.node.seq.last_rule().map(SortRule::fingerprint)
	}

	pub fn filter_is_all(&self) -> bool {
		self.node.filter.is_all()
	}

	pub fn insert_policy(&self) -> InsertPolicy {
		self.node.insert_policy
	}
}

/// Write handle on one initialized view.
///
/// Mutations that change membership propagate to descendants. Sorts and moves
/// change presentation order only and stay local unless stated otherwise.
pub struct ViewMut<'a, T> {
	store: &'a mut IdentityStore<T>,
	id: ViewId,
}

impl<'a, T: Item> ViewMut<'a, T> {
	pub(crate) fn new(store: &'a mut IdentityStore<T>, id: ViewId) -> Self {
		Self { store, id }
	}

	pub fn id(&self) -> ViewId {
		self.id
	}

	/// Read access without giving up the write handle.
	pub fn view(&self) -> ViewRef<'_, T> {
		let node = &self.store.views[self.id.slot];
		ViewRef::new(self.store, self.id, node)
	}

	/// Replaces the filter and recomputes membership against the parent.
	/// Returns whether membership changed.
	pub fn change_filter(&mut self, filter: Filter<T>) -> Result<bool> {
		self.store.change_filter(self.id, filter)
	}

	/// Full sort by `rule`; skipped when the sequence is known to be in that
	/// order already.
	pub fn sort_by(&mut self, rule: &SortRule<T>) -> Result<bool> {
		self.store.sort_view(self.id, rule)
	}

	/// Sorts `count` items starting at `index`.
	pub fn sort_range(&mut self, index: usize, count: usize, rule: &SortRule<T>) -> Result<()> {
		self.store.sort_view_range(self.id, index, count, rule)
	}

	/// Repeats the last full sort, overriding manual moves.
	pub fn redo_last_sort(&mut self) -> Result<bool> {
		self.store.redo_last_sort(self.id)
	}

	/// Repeats the last full sort on this view and every initialized
	/// descendant. Returns how many views were actually re-sorted.
	pub fn redo_last_sort_recursively(&mut self) -> Result<usize> {
		self.store.redo_last_sort_recursively(self.id)
	}

	/// Moves the item at `from` to `to`. Children are unaffected.
	pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
		self.store.move_in_view(self.id, from, to)
	}

	/// Replaces the value at `index` through the store.
	pub fn set_at(&mut self, index: usize, value: T) -> Result<T> {
		let id = self.view().id_at(index)?;
		self.store.set(id, value)
	}

	/// Removes the item at `index` from the store, and so from every view.
	pub fn remove_at(&mut self, index: usize) -> Result<T> {
		let id = self.view().id_at(index)?;
		self.store.take(id).ok_or(CascadeError::ItemNotFound(id))
	}

	/// Creates and initializes a child view filtered from this one.
	pub fn add_child_view(&mut self, key: impl Into<String>, spec: ViewSpec<T>) -> Result<ViewId> {
		self.store.insert_view(Some(self.id), key.into(), spec, false)
	}

	/// Unregisters the child under `key` and discards its subtree.
	pub fn remove_child_view(&mut self, key: &str) -> bool {
		let removed = self.store.views[self.id.slot].children.shift_remove(key);
		match removed {
			Some(child) => {
				self.store.discard_subtree(child);
				true
			}
			None => false,
		}
	}

	/// Notifier for this view, creating an inline one on first use.
	pub fn observe(&mut self) -> Arc<ChangeNotifier<T>> {
		let node = &mut self.store.views[self.id.slot];
		node.notifier.get_or_insert_with(|| Arc::new(ChangeNotifier::inline())).clone()
	}

	/// Attaches `notifier`, replacing any previous one.
	pub fn attach_notifier(&mut self, notifier: Arc<ChangeNotifier<T>>) -> Option<Arc<ChangeNotifier<T>>> {
		self.store.views[self.id.slot].notifier.replace(notifier)
	}

	pub fn detach_notifier(&mut self) -> Option<Arc<ChangeNotifier<T>>> {
		self.store.views[self.id.slot].notifier.take()
	}
}

impl<T: Item + Ord> ViewMut<'_, T> {
	/// Full ascending sort.
	pub fn sort(&mut self) -> Result<bool> {
		self.sort_by(&SortRule::natural())
	}
}

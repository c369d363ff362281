//! Incremental maintenance of the view tree.
//!
//! Structural changes enter at a view and walk down to its descendants; a
//! child only ever hears about identities its parent admits, except removals,
//! which propagate unconditionally.

use rustc_hash::FxHashSet;
use slab::Slab;
use smallvec::SmallVec;

use super::{ViewNode, ViewState, ViewSpec};
use crate::error::{CascadeError, Result};
use crate::id::{ItemId, ViewId};
use crate::notify::ViewEvent;
use crate::options::InsertPolicy;
use crate::rule::{Filter, SortRule};
use crate::store::{IdentityStore, Item};

type Children = SmallVec<[ViewId; 4]>;

/// Places an admitted identity according to the node's insert policy.
fn admit<T>(node: &mut ViewNode<T>, id: ItemId, items: &Slab<T>) -> usize {
	match node.insert_policy {
		InsertPolicy::Append => node.seq.insert(id),
		InsertPolicy::InOrder => node.seq.insert_in_order(id, |id| &items[id.0]),
	}
}

fn children_of<T>(node: &ViewNode<T>) -> Children {
	node.children.values().copied().collect()
}

impl<T: Item> IdentityStore<T> {
	pub(crate) fn insert_view(&mut self, parent: Option<ViewId>, key: String, spec: ViewSpec<T>, deferred: bool) -> Result<ViewId> {
		let registry = match parent {
			None => &self.roots,
			Some(parent) => &self.ready_node(parent)?.children,
		};
		if registry.contains_key(&key) {
			return Err(CascadeError::DuplicateKey { key });
		}

		let generation = self.next_generation();
		let node = ViewNode::new(key.clone(), generation, parent, spec, self.options.insert_policy);
		let id = ViewId::new(self.views.insert(node), generation);
		match parent {
			None => self.roots.insert(key, id),
			Some(parent) => self.views[parent.slot].children.insert(key, id),
		};
		tracing::debug!(view = %id, parent = ?parent, deferred, "cascade.view.register");

		if !deferred {
			self.initialize_view(id)?;
		}
		Ok(id)
	}

	/// Runs the initial filter and sort pass of a view registered with
	/// [`IdentityStore::add_view_deferred`]. Already initialized views are left
	/// untouched.
	pub fn initialize_view(&mut self, id: ViewId) -> Result<()> {
		let node = self.node(id)?;
		if node.is_initialized() {
			return Ok(());
		}
		let candidates = self.parent_ids(node.parent)?;

		let (items, views) = (&self.items, &mut self.views);
		let node = &mut views[id.slot];
		for candidate in candidates {
			if node.filter.matches(&items[candidate.0]) {
				node.seq.insert(candidate);
			}
		}
		if let Some(rule) = node.initial_sort.take() {
			node.seq.sort(&rule, |id| &items[id.0]);
		}
		node.state = ViewState::Initialized;
		tracing::debug!(view = %id, admitted = node.seq.len(), "cascade.view.initialize");
		Ok(())
	}

	/// Identities exposed by `parent`, or by the store for root views.
	fn parent_ids(&self, parent: Option<ViewId>) -> Result<Vec<ItemId>> {
		match parent {
			None => Ok(self.ids()),
			Some(parent) => Ok(self.ready_node(parent)?.seq.ids().to_vec()),
		}
	}

	/// Drops `root` and all of its descendants from the arena.
	pub(crate) fn discard_subtree(&mut self, root: ViewId) {
		let mut stack = vec![root];
		let mut discarded = 0usize;
		while let Some(id) = stack.pop() {
			if self.node(id).is_err() {
				continue;
			}
			let node = self.views.remove(id.slot);
			stack.extend(node.children.values().copied());
			discarded += 1;
		}
		tracing::debug!(view = %root, discarded, "cascade.view.discard");
	}

	pub(crate) fn propagate_added(&mut self, view: ViewId, id: ItemId) {
		let (items, views) = (&self.items, &mut self.views);
		let node = &mut views[view.slot];
		if node.state != ViewState::Initialized {
			return;
		}
		let value = &items[id.0];
		if !node.filter.matches(value) {
			return;
		}
		let index = admit(node, id, items);
		tracing::trace!(%view, %id, index, "cascade.view.added");
		node.notify(|| ViewEvent::Added { value: value.clone(), index });

		for child in children_of(node) {
			self.propagate_added(child, id);
		}
	}

	/// `value` is the item's value as the view last saw it.
	pub(crate) fn propagate_removed(&mut self, view: ViewId, id: ItemId, value: &T) {
		let node = &mut self.views[view.slot];
		if node.state != ViewState::Initialized {
			return;
		}
		if let Some(index) = node.seq.remove_id(id) {
			tracing::trace!(%view, %id, index, "cascade.view.removed");
			node.notify(|| ViewEvent::Removed { value: value.clone(), index });
		}

		for child in children_of(node) {
			self.propagate_removed(child, id, value);
		}
	}

	/// Re-evaluates membership of `id`, whose value was `old` and is now the
	/// store's current value.
	pub(crate) fn propagate_replaced(&mut self, view: ViewId, id: ItemId, old: &T) {
		let (items, views) = (&self.items, &mut self.views);
		let node = &mut views[view.slot];
		if node.state != ViewState::Initialized {
			return;
		}
		let new = &items[id.0];
		let children = children_of(node);

		match (node.seq.index_of(id), node.filter.matches(new)) {
			(Some(index), true) => {
				node.seq.mark_dirty();
				node.notify(|| ViewEvent::Replaced {
					old: old.clone(),
					new: new.clone(),
					index,
				});
				for child in children {
					self.propagate_replaced(child, id, old);
				}
			}
			(None, true) => {
				let index = admit(node, id, items);
				tracing::trace!(%view, %id, index, "cascade.view.entered");
				node.notify(|| ViewEvent::Added { value: new.clone(), index });
				for child in children {
					self.propagate_added(child, id);
				}
			}
			(Some(index), false) => {
				node.seq.remove_id(id);
				tracing::trace!(%view, %id, index, "cascade.view.left");
				node.notify(|| ViewEvent::Removed { value: old.clone(), index });
				for child in children {
					self.propagate_removed(child, id, old);
				}
			}
			(None, false) => {}
		}
	}

	/// Recomputes membership of `view` under `filter` by set difference
	/// against its parent.
	pub(crate) fn change_filter(&mut self, view: ViewId, filter: Filter<T>) -> Result<bool> {
		let node = self.ready_node(view)?;
		if node.filter.is_all() && filter.is_all() {
			return Ok(false);
		}
		let candidates = self.parent_ids(node.parent)?;

		let (items, views) = (&self.items, &mut self.views);
		let node = &mut views[view.slot];
		let admitted: FxHashSet<ItemId> = if filter.is_all() {
			candidates.iter().copied().collect()
		} else {
			candidates.iter().copied().filter(|id| filter.matches(&items[id.0])).collect()
		};
		let current: FxHashSet<ItemId> = node.seq.ids().iter().copied().collect();

		let removed: Vec<ItemId> = node.seq.ids().iter().copied().filter(|id| !admitted.contains(id)).collect();
		let added: Vec<ItemId> = candidates
			.iter()
			.copied()
			.filter(|id| admitted.contains(id) && !current.contains(id))
			.collect();

		node.filter = filter;
		if !removed.is_empty() {
			node.seq.retain(|id| admitted.contains(&id));
		}
		for &id in &added {
			admit(node, id, items);
		}
		let changed = !removed.is_empty() || !added.is_empty();
		if changed {
			node.notify(|| ViewEvent::Reset);
		}
		tracing::debug!(%view, added = added.len(), removed = removed.len(), "cascade.view.change_filter");

		let children = children_of(node);
		let removed_values: Vec<(ItemId, T)> = removed.into_iter().map(|id| (id, items[id.0].clone())).collect();
		for child in children {
			for (id, value) in &removed_values {
				self.propagate_removed(child, *id, value);
			}
			for &id in &added {
				self.propagate_added(child, id);
			}
		}
		Ok(changed)
	}

	pub(crate) fn sort_view(&mut self, view: ViewId, rule: &SortRule<T>) -> Result<bool> {
		self.ready_node(view)?;
		let (items, views) = (&self.items, &mut self.views);
		let node = &mut views[view.slot];
		let sorted = node.seq.sort(rule, |id| &items[id.0]);
		if sorted {
			node.notify(|| ViewEvent::Reset);
		}
		tracing::debug!(%view, sorted, fingerprint = ?rule.fingerprint(), "cascade.view.sort");
		Ok(sorted)
	}

	pub(crate) fn sort_view_range(&mut self, view: ViewId, index: usize, count: usize, rule: &SortRule<T>) -> Result<()> {
		self.ready_node(view)?;
		let (items, views) = (&self.items, &mut self.views);
		let node = &mut views[view.slot];
		node.seq.sort_range(index, count, rule, |id| &items[id.0])?;
		if count > 1 {
			node.notify(|| ViewEvent::Reset);
		}
		Ok(())
	}

	pub(crate) fn redo_last_sort(&mut self, view: ViewId) -> Result<bool> {
		self.ready_node(view)?;
		let (items, views) = (&self.items, &mut self.views);
		let node = &mut views[view.slot];
		let sorted = node.seq.redo_last_sort(|id| &items[id.0]);
		if sorted {
			node.notify(|| ViewEvent::Reset);
		}
		tracing::debug!(%view, sorted, "cascade.view.redo_sort");
		Ok(sorted)
	}

	pub(crate) fn redo_last_sort_recursively(&mut self, view: ViewId) -> Result<usize> {
		self.ready_node(view)?;
		let mut stack = vec![view];
		let mut resorted = 0usize;
		while let Some(current) = stack.pop() {
			let Ok(node) = self.ready_node(current) else {
				continue;
			};
			stack.extend(node.children.values().copied());
			if self.redo_last_sort(current)? {
				resorted += 1;
			}
		}
		Ok(resorted)
	}

	pub(crate) fn move_in_view(&mut self, view: ViewId, from: usize, to: usize) -> Result<()> {
		self.ready_node(view)?;
		let (items, views) = (&self.items, &mut self.views);
		let node = &mut views[view.slot];
		let id = node.seq.move_item(from, to)?;
		if from != to {
			node.notify(|| ViewEvent::Moved {
				value: items[id.0].clone(),
				from,
				to,
			});
		}
		Ok(())
	}
}

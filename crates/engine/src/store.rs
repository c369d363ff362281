//! Identity store: the root of a cascade.
//!
//! # Role
//!
//! Owns every item value, hands out stable [`ItemId`]s, enforces value
//! uniqueness and owns the arena of views derived from it. Structural changes
//! flow from here to the root views and on down the tree.
//!
//! # Invariants
//!
//! - No two live identities map to equal values.
//! - `order` lists every live item exactly once, keyed by the stamp taken
//!   when it was added; `index` and `items` hold the same set keyed by value
//!   and by identity. Removing or replacing an item never shifts the others.
//! - Freed identities are reused most-recent-first, otherwise identities grow
//!   monotonically.

use std::collections::BTreeMap;
use std::hash::Hash;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use slab::Slab;
use smallvec::SmallVec;

use crate::error::{CascadeError, Result};
use crate::id::{ItemId, ViewId};
use crate::options::CascadeOptions;
use crate::view::{ViewMut, ViewNode, ViewRef, ViewSpec};

pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Marker trait for values that can live in an [`IdentityStore`].
pub trait Item: Clone + Eq + Hash + Send + Sync + 'static {}
impl<T> Item for T where T: Clone + Eq + Hash + Send + Sync + 'static {}

/// Owner of all items and of the views derived from them.
pub struct IdentityStore<T> {
	pub(crate) items: Slab<T>,
	index: FxHashMap<T, ItemId>,
	order: BTreeMap<u64, ItemId>,
	/// Insertion stamp per identity slot.
	stamps: Vec<u64>,
	next_stamp: u64,
	pub(crate) views: Slab<ViewNode<T>>,
	pub(crate) roots: FxIndexMap<String, ViewId>,
	pub(crate) options: CascadeOptions,
	next_generation: u64,
}

impl<T: Item> Default for IdentityStore<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Item> IdentityStore<T> {
	pub fn new() -> Self {
		Self::with_options(CascadeOptions::default())
	}

	pub fn with_options(options: CascadeOptions) -> Self {
		Self {
			items: Slab::new(),
			index: FxHashMap::default(),
			order: BTreeMap::new(),
			stamps: Vec::new(),
			next_stamp: 0,
			views: Slab::new(),
			roots: FxIndexMap::default(),
			options,
			next_generation: 0,
		}
	}

	pub fn options(&self) -> CascadeOptions {
		self.options
	}

	/// Number of live items.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Stores `value` under a fresh or recycled identity and offers it to
	/// every root view.
	pub fn add(&mut self, value: T) -> Result<ItemId> {
		if let Some(&existing) = self.index.get(&value) {
			return Err(CascadeError::DuplicateValue { existing });
		}
		let id = ItemId(self.items.insert(value.clone()));
		self.index.insert(value, id);
		let stamp = self.next_stamp;
		self.next_stamp += 1;
		match self.stamps.get_mut(id.0) {
			Some(slot) => *slot = stamp,
			None => self.stamps.push(stamp),
		}
		self.order.insert(stamp, id);
		tracing::trace!(%id, "cascade.store.add");
		for root in self.root_handles() {
			self.propagate_added(root, id);
		}
		Ok(id)
	}

	/// Removes the item equal to `value`. Returns false if absent.
	pub fn remove(&mut self, value: &T) -> bool {
		match self.index.get(value) {
			Some(&id) => self.remove_by_id(id),
			None => false,
		}
	}

	/// Removes the item with identity `id`. Returns false if absent.
	pub fn remove_by_id(&mut self, id: ItemId) -> bool {
		self.take(id).is_some()
	}

	/// Removes the item with identity `id` and returns its value.
	pub fn take(&mut self, id: ItemId) -> Option<T> {
		let value = self.items.try_remove(id.0)?;
		self.index.remove(&value);
		self.order.remove(&self.stamps[id.0]);
		tracing::trace!(%id, "cascade.store.remove");
		for root in self.root_handles() {
			self.propagate_removed(root, id, &value);
		}
		Some(value)
	}

	pub fn get(&self, id: ItemId) -> Result<&T> {
		self.items.get(id.0).ok_or(CascadeError::ItemNotFound(id))
	}

	pub fn try_get(&self, id: ItemId) -> Option<&T> {
		self.items.get(id.0)
	}

	/// Identity currently holding `value`.
	pub fn id_of(&self, value: &T) -> Option<ItemId> {
		self.index.get(value).copied()
	}

	pub fn contains(&self, value: &T) -> bool {
		self.index.contains_key(value)
	}

	/// Replaces the value behind `id` and returns the previous value.
	///
	/// Views re-evaluate membership for `id`; positions of items that stay
	/// admitted are unchanged until the view is sorted again.
	pub fn set(&mut self, id: ItemId, value: T) -> Result<T> {
		if !self.items.contains(id.0) {
			return Err(CascadeError::ItemNotFound(id));
		}
		if let Some(&existing) = self.index.get(&value)
			&& existing != id
		{
			return Err(CascadeError::DuplicateValue { existing });
		}
		let old = std::mem::replace(&mut self.items[id.0], value.clone());
		self.index.remove(&old);
		self.index.insert(value, id);
		tracing::trace!(%id, "cascade.store.set");
		for root in self.root_handles() {
			self.propagate_replaced(root, id, &old);
		}
		Ok(old)
	}

	/// Snapshot of live identities in insertion order.
	pub fn ids(&self) -> Vec<ItemId> {
		self.order.values().copied().collect()
	}

	/// Snapshot of live values in insertion order.
	pub fn values(&self) -> Vec<T> {
		self.order.values().map(|id| self.items[id.0].clone()).collect()
	}

	/// Creates a root view over the whole store and runs its initial pass.
	pub fn add_view(&mut self, key: impl Into<String>, spec: ViewSpec<T>) -> Result<ViewId> {
		self.insert_view(None, key.into(), spec, false)
	}

	/// Registers a view without running its initial pass.
	///
	/// The view stays uninitialized, ignored by propagation and rejected by
	/// [`Self::view`], until [`Self::initialize_view`] runs. Used when the
	/// initial pass is deferred to a background task.
	pub fn add_view_deferred(&mut self, parent: Option<ViewId>, key: impl Into<String>, spec: ViewSpec<T>) -> Result<ViewId> {
		self.insert_view(parent, key.into(), spec, true)
	}

	/// Unregisters the root view under `key` and discards its subtree.
	pub fn remove_view(&mut self, key: &str) -> bool {
		match self.roots.shift_remove(key) {
			Some(id) => {
				self.discard_subtree(id);
				true
			}
			None => false,
		}
	}

	pub fn root_view(&self, key: &str) -> Option<ViewId> {
		self.roots.get(key).copied()
	}

	pub fn root_keys(&self) -> impl Iterator<Item = &str> {
		self.roots.keys().map(String::as_str)
	}

	/// Number of views in the arena, initialized or not.
	pub fn view_count(&self) -> usize {
		self.views.len()
	}

	/// Read handle on an initialized view.
	pub fn view(&self, id: ViewId) -> Result<ViewRef<'_, T>> {
		let node = self.ready_node(id)?;
		Ok(ViewRef::new(self, id, node))
	}

	/// Write handle on an initialized view.
	pub fn view_mut(&mut self, id: ViewId) -> Result<ViewMut<'_, T>> {
		self.ready_node(id)?;
		Ok(ViewMut::new(self, id))
	}

	/// Whether `id` has completed its initial pass.
	pub fn is_view_initialized(&self, id: ViewId) -> Result<bool> {
		Ok(self.node(id)?.is_initialized())
	}

	pub(crate) fn root_handles(&self) -> SmallVec<[ViewId; 8]> {
		self.roots.values().copied().collect()
	}

	pub(crate) fn next_generation(&mut self) -> u64 {
		self.next_generation += 1;
		self.next_generation
	}

	pub(crate) fn node(&self, id: ViewId) -> Result<&ViewNode<T>> {
		self.views
			.get(id.slot)
			.filter(|node| node.generation == id.generation)
			.ok_or(CascadeError::ViewNotFound(id))
	}

	pub(crate) fn node_mut(&mut self, id: ViewId) -> Result<&mut ViewNode<T>> {
		self.views
			.get_mut(id.slot)
			.filter(|node| node.generation == id.generation)
			.ok_or(CascadeError::ViewNotFound(id))
	}

	pub(crate) fn ready_node(&self, id: ViewId) -> Result<&ViewNode<T>> {
		let node = self.node(id)?;
		if node.is_initialized() {
			Ok(node)
		} else {
			Err(CascadeError::NotInitialized(id))
		}
	}
}

impl<T> std::fmt::Debug for IdentityStore<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IdentityStore")
			.field("items", &self.items.len())
			.field("views", &self.views.len())
			.field("roots", &self.roots)
			.field("options", &self.options)
			.finish()
	}
}

#[cfg(test)]
mod tests;

//! Thread-safe store handle.
//!
//! # Role
//!
//! [`SharedStore`] wraps an [`IdentityStore`] and its whole view tree in one
//! coarse read/write lock. Every operation, including the propagation it
//! triggers, is atomic with respect to every other operation on the same
//! cascade, so sibling views are never observed mid-propagation.
//!
//! # Invariants
//!
//! - Lock order is store lock, then the pending-gate map. Gate waits never
//!   happen while either is held.
//! - A view registered for background initialization has its gate in
//!   `pending` before the store lock is released.

use std::sync::Arc;

use cascade_engine::{CascadeOptions, IdentityStore, InitMode, Item, ItemId, Result, ViewId, ViewSpec};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::FxHashMap;
use tokio::task::JoinHandle;

use crate::gate::{InitGate, OpenOnDrop};
use crate::runtime::{TaskKind, spawn_blocking};
use crate::view::SharedView;

/// Cloneable, thread-safe handle on one cascade.
pub struct SharedStore<T> {
	inner: Arc<SharedInner<T>>,
}

struct SharedInner<T> {
	store: RwLock<IdentityStore<T>>,
	/// Gates of views whose background initial pass has not finished.
	pending: Mutex<FxHashMap<ViewId, Arc<InitGate>>>,
}

impl<T> Clone for SharedStore<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T: Item> Default for SharedStore<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Item> SharedStore<T> {
	pub fn new() -> Self {
		Self::from_store(IdentityStore::new())
	}

	pub fn with_options(options: CascadeOptions) -> Self {
		Self::from_store(IdentityStore::with_options(options))
	}

	/// Takes ownership of an existing cascade.
	pub fn from_store(store: IdentityStore<T>) -> Self {
		Self {
			inner: Arc::new(SharedInner {
				store: RwLock::new(store),
				pending: Mutex::new(FxHashMap::default()),
			}),
		}
	}

	pub fn options(&self) -> CascadeOptions {
		self.read().options()
	}

	pub(crate) fn read(&self) -> RwLockReadGuard<'_, IdentityStore<T>> {
		self.inner.store.read()
	}

	pub(crate) fn write(&self) -> RwLockWriteGuard<'_, IdentityStore<T>> {
		self.inner.store.write()
	}

	/// Runs `f` with shared access to the whole cascade, for reads that must
	/// be consistent across several views.
	pub fn with_store<R>(&self, f: impl FnOnce(&IdentityStore<T>) -> R) -> R {
		f(&self.read())
	}

	/// Runs `f` with exclusive access to the whole cascade.
	pub fn with_store_mut<R>(&self, f: impl FnOnce(&mut IdentityStore<T>) -> R) -> R {
		f(&mut self.write())
	}

	pub fn len(&self) -> usize {
		self.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.read().is_empty()
	}

	pub fn add(&self, value: T) -> Result<ItemId> {
		self.write().add(value)
	}

	pub fn remove(&self, value: &T) -> bool {
		self.write().remove(value)
	}

	pub fn remove_by_id(&self, id: ItemId) -> bool {
		self.write().remove_by_id(id)
	}

	pub fn get(&self, id: ItemId) -> Result<T> {
		self.read().get(id).cloned()
	}

	pub fn id_of(&self, value: &T) -> Option<ItemId> {
		self.read().id_of(value)
	}

	pub fn contains(&self, value: &T) -> bool {
		self.read().contains(value)
	}

	/// Replaces the value behind `id`, returning the previous value.
	pub fn set(&self, id: ItemId, value: T) -> Result<T> {
		self.write().set(id, value)
	}

	pub fn ids(&self) -> Vec<ItemId> {
		self.read().ids()
	}

	pub fn values(&self) -> Vec<T> {
		self.read().values()
	}

	/// Creates a root view, initialized per the store's [`InitMode`].
	pub fn add_view(&self, key: impl Into<String>, spec: ViewSpec<T>) -> Result<SharedView<T>> {
		let mode = self.options().init;
		self.register(None, key.into(), spec, mode)
	}

	/// Creates a root view with an explicit [`InitMode`].
	pub fn add_view_with(&self, key: impl Into<String>, spec: ViewSpec<T>, mode: InitMode) -> Result<SharedView<T>> {
		self.register(None, key.into(), spec, mode)
	}

	pub fn remove_view(&self, key: &str) -> bool {
		self.write().remove_view(key)
	}

	pub fn root_view(&self, key: &str) -> Option<SharedView<T>> {
		let store = self.read();
		let id = store.root_view(key)?;
		Some(SharedView::new(self.clone(), id, self.gate_for(id)))
	}

	pub fn add_async(&self, value: T) -> JoinHandle<Result<ItemId>> {
		let shared = self.clone();
		spawn_blocking(TaskKind::Mutation, move || shared.add(value))
	}

	pub fn remove_async(&self, value: T) -> JoinHandle<bool> {
		let shared = self.clone();
		spawn_blocking(TaskKind::Mutation, move || shared.remove(&value))
	}

	pub fn remove_by_id_async(&self, id: ItemId) -> JoinHandle<bool> {
		let shared = self.clone();
		spawn_blocking(TaskKind::Mutation, move || shared.remove_by_id(id))
	}

	pub fn set_async(&self, id: ItemId, value: T) -> JoinHandle<Result<T>> {
		let shared = self.clone();
		spawn_blocking(TaskKind::Mutation, move || shared.set(id, value))
	}

	/// Gate for `id`: the pending one if its initial pass is still running,
	/// otherwise an open one.
	pub(crate) fn gate_for(&self, id: ViewId) -> Arc<InitGate> {
		self.inner
			.pending
			.lock()
			.get(&id)
			.cloned()
			.unwrap_or_else(|| Arc::new(InitGate::opened()))
	}

	pub(crate) fn register(&self, parent: Option<ViewId>, key: String, spec: ViewSpec<T>, mode: InitMode) -> Result<SharedView<T>> {
		match mode {
			InitMode::Inline => {
				let id = {
					let mut store = self.write();
					match parent {
						None => store.add_view(key, spec)?,
						Some(parent) => store.view_mut(parent)?.add_child_view(key, spec)?,
					}
				};
				Ok(SharedView::new(self.clone(), id, Arc::new(InitGate::opened())))
			}
			InitMode::Background => {
				let gate = Arc::new(InitGate::new());
				let id = {
					let mut store = self.write();
					let id = store.add_view_deferred(parent, key, spec)?;
					self.inner.pending.lock().insert(id, Arc::clone(&gate));
					id
				};
				self.spawn_initial_pass(id, Arc::clone(&gate));
				Ok(SharedView::new(self.clone(), id, gate))
			}
		}
	}

	fn spawn_initial_pass(&self, id: ViewId, gate: Arc<InitGate>) {
		let shared = self.clone();
		// Detached; the gate reports completion.
		drop(spawn_blocking(TaskKind::InitialPass, move || {
			let _open = OpenOnDrop::new(gate);
			let mut store = shared.write();
			match store.initialize_view(id) {
				Ok(()) => tracing::debug!(view = %id, "cascade.sync.initialized"),
				Err(err) => tracing::debug!(view = %id, %err, "cascade.sync.initialize_skipped"),
			}
			shared.inner.pending.lock().remove(&id);
		}));
	}
}

impl<T> std::fmt::Debug for SharedStore<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SharedStore")
			.field("pending", &self.inner.pending.lock().len())
			.finish_non_exhaustive()
	}
}

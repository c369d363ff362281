//! Thread-safe view handle.

use std::sync::Arc;

use cascade_engine::{ChangeNotifier, Filter, InitMode, Item, ItemId, Result, SortRule, ViewId, ViewMut, ViewRef, ViewSpec};
use tokio::task::JoinHandle;

use crate::gate::InitGate;
use crate::runtime::{TaskKind, spawn_blocking};
use crate::store::SharedStore;

/// Handle on one view of a [`SharedStore`].
///
/// Blocking reads and mutations wait for the view's initial pass before
/// taking the store lock. The `try_*` reads fail with `NotInitialized`
/// instead of waiting.
pub struct SharedView<T> {
	shared: SharedStore<T>,
	id: ViewId,
	gate: Arc<InitGate>,
}

impl<T> Clone for SharedView<T> {
	fn clone(&self) -> Self {
		Self {
			shared: self.shared.clone(),
			id: self.id,
			gate: Arc::clone(&self.gate),
		}
	}
}

impl<T: Item> SharedView<T> {
	pub(crate) fn new(shared: SharedStore<T>, id: ViewId, gate: Arc<InitGate>) -> Self {
		Self { shared, id, gate }
	}

	pub fn id(&self) -> ViewId {
		self.id
	}

	pub fn store(&self) -> &SharedStore<T> {
		&self.shared
	}

	/// Whether the initial pass has finished.
	pub fn is_ready(&self) -> bool {
		self.gate.is_open()
	}

	/// Blocks until the initial pass has finished.
	pub fn wait_ready(&self) {
		self.gate.wait();
	}

	/// Runs `f` against a consistent snapshot of this view.
	pub fn with_view<R>(&self, f: impl FnOnce(ViewRef<'_, T>) -> R) -> Result<R> {
		self.gate.wait();
		let store = self.shared.read();
		Ok(f(store.view(self.id)?))
	}

	fn with_view_mut<R>(&self, f: impl FnOnce(ViewMut<'_, T>) -> Result<R>) -> Result<R> {
		self.gate.wait();
		let mut store = self.shared.write();
		f(store.view_mut(self.id)?)
	}

	pub fn len(&self) -> Result<usize> {
		self.with_view(|view| view.len())
	}

	pub fn is_empty(&self) -> Result<bool> {
		self.with_view(|view| view.is_empty())
	}

	pub fn try_len(&self) -> Result<usize> {
		self.gate.check(self.id)?;
		self.shared.read().view(self.id).map(|view| view.len())
	}

	pub fn try_to_vec(&self) -> Result<Vec<T>> {
		self.gate.check(self.id)?;
		self.shared.read().view(self.id).map(|view| view.to_vec())
	}

	/// Value at `index`, cloned out of the lock.
	pub fn get(&self, index: usize) -> Result<T> {
		self.with_view(|view| view.get(index).cloned())?
	}

	pub fn to_vec(&self) -> Result<Vec<T>> {
		self.with_view(|view| view.to_vec())
	}

	pub fn ids(&self) -> Result<Vec<ItemId>> {
		self.with_view(|view| view.ids().to_vec())
	}

	pub fn index_of(&self, value: &T) -> Result<Option<usize>> {
		self.with_view(|view| view.index_of(value))
	}

	pub fn contains(&self, value: &T) -> Result<bool> {
		self.with_view(|view| view.contains(value))
	}

	pub fn change_filter(&self, filter: Filter<T>) -> Result<bool> {
		self.with_view_mut(|mut view| view.change_filter(filter))
	}

	pub fn sort_by(&self, rule: &SortRule<T>) -> Result<bool> {
		self.with_view_mut(|mut view| view.sort_by(rule))
	}

	pub fn sort_range(&self, index: usize, count: usize, rule: &SortRule<T>) -> Result<()> {
		self.with_view_mut(|mut view| view.sort_range(index, count, rule))
	}

	pub fn redo_last_sort(&self) -> Result<bool> {
		self.with_view_mut(|mut view| view.redo_last_sort())
	}

	pub fn redo_last_sort_recursively(&self) -> Result<usize> {
		self.with_view_mut(|mut view| view.redo_last_sort_recursively())
	}

	pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
		self.with_view_mut(|mut view| view.move_item(from, to))
	}

	pub fn set_at(&self, index: usize, value: T) -> Result<T> {
		self.with_view_mut(|mut view| view.set_at(index, value))
	}

	pub fn remove_at(&self, index: usize) -> Result<T> {
		self.with_view_mut(|mut view| view.remove_at(index))
	}

	/// Creates a child view, initialized per the store's [`InitMode`].
	pub fn add_child_view(&self, key: impl Into<String>, spec: ViewSpec<T>) -> Result<SharedView<T>> {
		let mode = self.shared.options().init;
		self.add_child_view_with(key, spec, mode)
	}

	pub fn add_child_view_with(&self, key: impl Into<String>, spec: ViewSpec<T>, mode: InitMode) -> Result<SharedView<T>> {
		self.gate.wait();
		self.shared.register(Some(self.id), key.into(), spec, mode)
	}

	pub fn remove_child_view(&self, key: &str) -> Result<bool> {
		self.with_view_mut(|mut view| Ok(view.remove_child_view(key)))
	}

	pub fn child_view(&self, key: &str) -> Result<Option<SharedView<T>>> {
		let child = self.with_view(|view| view.child_view(key))?;
		Ok(child.map(|id| SharedView::new(self.shared.clone(), id, self.shared.gate_for(id))))
	}

	/// Notifier for this view, created with inline delivery on first use.
	pub fn observe(&self) -> Result<Arc<ChangeNotifier<T>>> {
		self.with_view_mut(|mut view| Ok(view.observe()))
	}

	/// Installs `notifier`, returning the one it replaces.
	pub fn attach_notifier(&self, notifier: Arc<ChangeNotifier<T>>) -> Result<Option<Arc<ChangeNotifier<T>>>> {
		self.with_view_mut(|mut view| Ok(view.attach_notifier(notifier)))
	}

	pub fn change_filter_async(&self, filter: Filter<T>) -> JoinHandle<Result<bool>> {
		let view = self.clone();
		spawn_blocking(TaskKind::Mutation, move || view.change_filter(filter))
	}

	pub fn sort_by_async(&self, rule: SortRule<T>) -> JoinHandle<Result<bool>> {
		let view = self.clone();
		spawn_blocking(TaskKind::Mutation, move || view.sort_by(&rule))
	}

	pub fn redo_last_sort_async(&self) -> JoinHandle<Result<bool>> {
		let view = self.clone();
		spawn_blocking(TaskKind::Mutation, move || view.redo_last_sort())
	}
}

impl<T: Item + Ord> SharedView<T> {
	/// Sorts by the natural order of `T`.
	pub fn sort(&self) -> Result<bool> {
		self.with_view_mut(|mut view| view.sort())
	}
}

impl<T> std::fmt::Debug for SharedView<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SharedView")
			.field("id", &self.id)
			.field("ready", &self.gate.is_open())
			.finish()
	}
}

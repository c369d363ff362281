//! Ordered change notifications for a view.
//!
//! A [`ChangeNotifier`] turns primitive view mutations into a stream of
//! [`ViewEvent`]s delivered to subscribers through a [`Dispatcher`]. Between
//! [`ChangeNotifier::begin_bulk_update`] and the matching
//! [`ChangeNotifier::end_bulk_update`] individual events are dropped, and the
//! outermost end emits a single [`ViewEvent::Reset`].
//!
//! # Invariants
//!
//! - Events reach subscribers in emission order, whatever the dispatcher.
//! - Subscribers are snapshotted at emission time; a subscription added while
//!   an event is in flight does not see that event.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;
use smallvec::SmallVec;

/// One diff against a view's presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent<T> {
	/// `value` now sits at `index`.
	Added { value: T, index: usize },
	/// `value` left the view from `index`.
	Removed { value: T, index: usize },
	/// The item at `index` changed from `old` to `new`.
	Replaced { old: T, new: T, index: usize },
	/// `value` moved from `from` to `to`.
	Moved { value: T, from: usize, to: usize },
	/// The whole view must be re-read.
	Reset,
}

/// Deferred delivery of a batch of events.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Execution context that subscriber callbacks run on.
///
/// Implementations must run jobs in the order they were dispatched.
pub trait Dispatcher: Send + Sync {
	/// Whether the calling thread already is this dispatcher's context.
	fn is_current(&self) -> bool;

	/// Runs `job` on this dispatcher's context.
	fn dispatch(&self, job: Job);
}

/// Runs every job immediately on the emitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
	fn is_current(&self) -> bool {
		true
	}

	fn dispatch(&self, job: Job) {
		job();
	}
}

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Arc<dyn Fn(&ViewEvent<T>) + Send + Sync>;

/// Fan-out of [`ViewEvent`]s to subscribers with a bulk-update window.
pub struct ChangeNotifier<T> {
	subscribers: RwLock<Vec<(SubscriptionId, Subscriber<T>)>>,
	next_subscription: AtomicU64,
	bulk_depth: AtomicUsize,
	dispatcher: Arc<dyn Dispatcher>,
}

impl<T> ChangeNotifier<T>
where
	T: Clone + Send + Sync + 'static,
{
	pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
		Self {
			subscribers: RwLock::new(Vec::new()),
			next_subscription: AtomicU64::new(0),
			bulk_depth: AtomicUsize::new(0),
			dispatcher,
		}
	}

	/// Notifier delivering on the emitting thread.
	pub fn inline() -> Self {
		Self::new(Arc::new(InlineDispatcher))
	}

	pub fn subscribe(&self, f: impl Fn(&ViewEvent<T>) + Send + Sync + 'static) -> SubscriptionId {
		let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
		self.subscribers.write().push((id, Arc::new(f)));
		id
	}

	/// Returns false if `id` was not subscribed.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		let mut subscribers = self.subscribers.write();
		let before = subscribers.len();
		subscribers.retain(|(existing, _)| *existing != id);
		subscribers.len() != before
	}

	pub fn subscriber_count(&self) -> usize {
		self.subscribers.read().len()
	}

	pub fn is_bulk_updating(&self) -> bool {
		self.bulk_depth.load(Ordering::Acquire) > 0
	}

	/// Opens a bulk-update window. Windows nest.
	pub fn begin_bulk_update(&self) {
		let depth = self.bulk_depth.fetch_add(1, Ordering::AcqRel) + 1;
		tracing::debug!(depth, "cascade.notify.bulk_begin");
	}

	/// Closes a bulk-update window. Closing the outermost window emits one
	/// [`ViewEvent::Reset`]; an unbalanced close is ignored.
	pub fn end_bulk_update(&self) {
		let previous = self
			.bulk_depth
			.fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| depth.checked_sub(1));
		match previous {
			Ok(1) => {
				tracing::debug!("cascade.notify.bulk_end");
				self.deliver(ViewEvent::Reset);
			}
			Ok(depth) => tracing::debug!(depth = depth - 1, "cascade.notify.bulk_end"),
			Err(_) => tracing::warn!("cascade.notify.bulk_end_unbalanced"),
		}
	}

	/// Opens a bulk-update window closed when the guard drops.
	pub fn bulk_update(&self) -> BulkUpdate<'_, T> {
		self.begin_bulk_update();
		BulkUpdate { notifier: self }
	}

	/// Emits `event` unless a bulk-update window is open.
	pub fn emit(&self, event: ViewEvent<T>) {
		if self.is_bulk_updating() {
			return;
		}
		self.deliver(event);
	}

	fn deliver(&self, event: ViewEvent<T>) {
		let subscribers: SmallVec<[Subscriber<T>; 4]> = self.subscribers.read().iter().map(|(_, f)| Arc::clone(f)).collect();
		if subscribers.is_empty() {
			return;
		}
		self.dispatcher.dispatch(Box::new(move || {
			for subscriber in &subscribers {
				subscriber(&event);
			}
		}));
	}
}

impl<T> std::fmt::Debug for ChangeNotifier<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ChangeNotifier")
			.field("subscribers", &self.subscribers.read().len())
			.field("bulk_depth", &self.bulk_depth.load(Ordering::Relaxed))
			.finish_non_exhaustive()
	}
}

/// Guard closing a bulk-update window on drop.
pub struct BulkUpdate<'a, T>
where
	T: Clone + Send + Sync + 'static,
{
	notifier: &'a ChangeNotifier<T>,
}

impl<T> Drop for BulkUpdate<'_, T>
where
	T: Clone + Send + Sync + 'static,
{
	fn drop(&mut self) {
		self.notifier.end_bulk_update();
	}
}

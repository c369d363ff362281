//! Notification delivery on a dedicated thread.

use std::sync::Arc;
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::ThreadId;

use cascade_engine::{Dispatcher, Job};
use tokio::sync::{mpsc, oneshot};

use crate::runtime::spawn_named_thread;

thread_local! {
	/// Set while a dispatcher thread is running a job.
	static IN_JOB: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running a job until dropped.
struct JobScope;

impl JobScope {
	fn enter() -> Self {
		IN_JOB.with(|flag| flag.set(true));
		Self
	}
}

impl Drop for JobScope {
	fn drop(&mut self) {
		IN_JOB.with(|flag| flag.set(false));
	}
}

/// Dispatcher owning one named thread that runs jobs in FIFO order.
///
/// Jobs dispatched from the dispatcher thread itself run inline only when no
/// job is running there and nothing is queued ahead of them. Everything else
/// is queued, so delivery order always matches dispatch order, including
/// events raised by a subscriber while an earlier event is still being
/// delivered. The thread exits once every clone is dropped and
/// the queue is drained.
#[derive(Clone)]
pub struct ThreadDispatcher {
	inner: Arc<DispatchInner>,
}

struct DispatchInner {
	tx: mpsc::UnboundedSender<Job>,
	/// Jobs sent but not yet taken off the queue.
	queued: Arc<AtomicUsize>,
	thread: ThreadId,
}

impl ThreadDispatcher {
	/// Starts the dispatcher thread under `name`.
	pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
		let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
		let queued = Arc::new(AtomicUsize::new(0));
		let worker_queued = Arc::clone(&queued);
		let handle = spawn_named_thread(name, move || {
			while let Some(job) = rx.blocking_recv() {
				worker_queued.fetch_sub(1, Ordering::AcqRel);
				let _scope = JobScope::enter();
				job();
			}
			tracing::debug!("cascade.dispatch.closed");
		})?;
		Ok(Self {
			inner: Arc::new(DispatchInner {
				tx,
				queued,
				thread: handle.thread().id(),
			}),
		})
	}

	/// Number of jobs waiting to run.
	pub fn queued(&self) -> usize {
		self.inner.queued.load(Ordering::Acquire)
	}

	/// Blocks until every job dispatched before this call has run.
	///
	/// Returns immediately on the dispatcher thread. Must not be called from
	/// inside an async context.
	pub fn flush(&self) {
		if self.is_current() {
			return;
		}
		let (done_tx, done_rx) = oneshot::channel();
		self.dispatch(Box::new(move || {
			let _ = done_tx.send(());
		}));
		let _ = done_rx.blocking_recv();
	}
}

impl Dispatcher for ThreadDispatcher {
	fn is_current(&self) -> bool {
		std::thread::current().id() == self.inner.thread
	}

	fn dispatch(&self, job: Job) {
		if self.is_current() && !IN_JOB.with(Cell::get) && self.queued() == 0 {
			let _scope = JobScope::enter();
			job();
			return;
		}
		self.inner.queued.fetch_add(1, Ordering::AcqRel);
		if self.inner.tx.send(job).is_err() {
			self.inner.queued.fetch_sub(1, Ordering::AcqRel);
			tracing::warn!("cascade.dispatch.send_after_close");
		}
	}
}

impl std::fmt::Debug for ThreadDispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ThreadDispatcher")
			.field("thread", &self.inner.thread)
			.field("queued", &self.queued())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;

	use super::*;

	#[test]
	fn jobs_run_in_dispatch_order_off_thread() {
		let dispatcher = ThreadDispatcher::spawn("dispatch-order").unwrap();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let caller = std::thread::current().id();

		for n in 0..50 {
			let seen = Arc::clone(&seen);
			dispatcher.dispatch(Box::new(move || {
				assert_ne!(std::thread::current().id(), caller);
				seen.lock().push(n);
			}));
		}
		dispatcher.flush();
		assert_eq!(*seen.lock(), (0..50).collect::<Vec<_>>());
	}

	#[test]
	fn dispatch_from_running_job_queues_behind_it() {
		let dispatcher = ThreadDispatcher::spawn("dispatch-nested").unwrap();
		let seen = Arc::new(Mutex::new(Vec::new()));

		let (ran_tx, ran_rx) = oneshot::channel();
		let inner_dispatcher = dispatcher.clone();
		let outer_seen = Arc::clone(&seen);
		dispatcher.dispatch(Box::new(move || {
			assert!(inner_dispatcher.is_current());
			let inner_seen = Arc::clone(&outer_seen);
			inner_dispatcher.dispatch(Box::new(move || {
				inner_seen.lock().push("inner");
				let _ = ran_tx.send(());
			}));
			outer_seen.lock().push("outer");
		}));
		ran_rx.blocking_recv().unwrap();
		assert_eq!(*seen.lock(), vec!["outer", "inner"]);
	}
}

//! One-shot latch guarding a view's deferred initial pass.

use std::sync::Arc;

use cascade_engine::{CascadeError, Result, ViewId};
use parking_lot::{Condvar, Mutex};

/// Latch that opens exactly once.
///
/// Views initialized inline get a gate that is already open, so callers see
/// the same wait-then-proceed contract whichever way the view was built.
#[derive(Debug, Default)]
pub struct InitGate {
	open: Mutex<bool>,
	opened: Condvar,
}

impl InitGate {
	/// A closed gate.
	pub fn new() -> Self {
		Self::default()
	}

	/// A gate that is already open.
	pub fn opened() -> Self {
		Self {
			open: Mutex::new(true),
			opened: Condvar::new(),
		}
	}

	pub fn is_open(&self) -> bool {
		*self.open.lock()
	}

	/// Opens the gate and wakes every waiter. Returns true on the call that
	/// performed the transition.
	pub fn open(&self) -> bool {
		let mut open = self.open.lock();
		if *open {
			return false;
		}
		*open = true;
		drop(open);
		self.opened.notify_all();
		true
	}

	/// Blocks until the gate is open. There is no timeout.
	pub fn wait(&self) {
		let mut open = self.open.lock();
		while !*open {
			self.opened.wait(&mut open);
		}
	}

	/// Non-blocking check for `view`.
	pub fn check(&self, view: ViewId) -> Result<()> {
		if self.is_open() {
			Ok(())
		} else {
			Err(CascadeError::NotInitialized(view))
		}
	}
}

/// Opens the wrapped gate when dropped, including during unwinding.
#[derive(Debug)]
pub struct OpenOnDrop(Arc<InitGate>);

impl OpenOnDrop {
	pub fn new(gate: Arc<InitGate>) -> Self {
		Self(gate)
	}
}

impl Drop for OpenOnDrop {
	fn drop(&mut self) {
		self.0.open();
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn open_is_one_shot() {
		let gate = InitGate::new();
		assert!(!gate.is_open());
		assert!(gate.open());
		assert!(!gate.open());
		assert!(gate.is_open());
	}

	#[test]
	fn wait_returns_after_open_from_another_thread() {
		let gate = Arc::new(InitGate::new());
		let opener = Arc::clone(&gate);
		let handle = std::thread::spawn(move || {
			std::thread::sleep(Duration::from_millis(20));
			opener.open();
		});
		gate.wait();
		assert!(gate.is_open());
		handle.join().unwrap();
	}

	#[test]
	fn guard_opens_on_panic() {
		let gate = Arc::new(InitGate::new());
		let guarded = Arc::clone(&gate);
		let result = std::thread::spawn(move || {
			let _open = OpenOnDrop::new(guarded);
			panic!("initial pass failed");
		})
		.join();
		assert!(result.is_err());
		assert!(gate.is_open());
	}

	#[test]
	fn check_reports_pending_view() {
		let mut store = cascade_engine::IdentityStore::<u8>::new();
		let view = store.add_view("v", cascade_engine::ViewSpec::new()).unwrap();
		assert_eq!(InitGate::new().check(view), Err(CascadeError::NotInitialized(view)));
		assert_eq!(InitGate::opened().check(view), Ok(()));
	}
}

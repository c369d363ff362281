//! Background execution for deferred initial passes and async wrappers.
//!
//! Work runs on the caller's Tokio runtime when there is one, otherwise on a
//! small process-wide runtime created on first use.

use std::sync::OnceLock;

use tokio::task::JoinHandle;

/// What a background task is doing, recorded on its tracing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
	/// Initial filter and sort pass of a deferred view.
	InitialPass,
	/// A store or view mutation issued through an async wrapper.
	Mutation,
}

impl TaskKind {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::InitialPass => "initial_pass",
			Self::Mutation => "mutation",
		}
	}
}

/// Fallback runtime for callers with no Tokio context, such as a plain
/// thread creating a background view. It only hosts the blocking pool, so
/// one async worker is enough.
static FALLBACK: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Handle that background passes and async wrappers are spawned on.
fn runtime_handle() -> tokio::runtime::Handle {
	match tokio::runtime::Handle::try_current() {
		Ok(handle) => handle,
		Err(_) => FALLBACK
			.get_or_init(|| {
				tokio::runtime::Builder::new_multi_thread()
					.worker_threads(1)
					.thread_name("cascade-background")
					.build()
					.expect("failed to build cascade fallback runtime")
			})
			.handle()
			.clone(),
	}
}

/// Runs lock-taking work on the blocking pool.
pub fn spawn_blocking<F, R>(kind: TaskKind, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(task = kind.as_str(), "cascade.sync.spawn_blocking");
	runtime_handle().spawn_blocking(f)
}

/// Spawns a dedicated named OS thread.
pub(crate) fn spawn_named_thread<F, R>(name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let name = name.into();
	tracing::trace!(thread = %name, "cascade.sync.spawn_thread");
	std::thread::Builder::new().name(name).spawn(f)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn spawn_blocking_without_context_uses_fallback() {
		assert!(tokio::runtime::Handle::try_current().is_err());
		let (tx, rx) = tokio::sync::oneshot::channel();
		drop(spawn_blocking(TaskKind::Mutation, move || {
			let _ = tx.send(std::thread::current().name().map(str::to_owned));
		}));
		let name = rx.blocking_recv().unwrap();
		assert!(name.is_some_and(|name| name.starts_with("cascade-background")));
	}
}

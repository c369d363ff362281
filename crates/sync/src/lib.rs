//! Thread-safe access to a cascade of filter views.
//!
//! # Role
//!
//! Wraps [`cascade_engine::IdentityStore`] for use from several threads:
//!
//! * [`SharedStore`] and [`SharedView`] serialize every operation through one
//!   coarse read/write lock over the whole cascade.
//! * Views created with [`cascade_engine::InitMode::Background`] compute their
//!   initial membership on a background task. Their [`InitGate`] blocks
//!   readers and writers until that pass completes.
//! * [`ThreadDispatcher`] delivers change notifications on a dedicated thread,
//!   outside the store lock.
//!
//! # Invariants
//!
//! - Notifications delivered inline run while the store lock is held.
//!   Subscribers that call back into the same [`SharedStore`] must be attached
//!   through a notifier backed by a [`ThreadDispatcher`].
//! - A gate opens exactly once, even when the initial pass panics.

/// Notification delivery threads.
pub mod dispatch;
/// Initialization latches.
pub mod gate;
/// Background task execution.
pub mod runtime;
mod store;
mod view;

pub use dispatch::ThreadDispatcher;
pub use gate::{InitGate, OpenOnDrop};
pub use runtime::{TaskKind, spawn_blocking};
pub use store::SharedStore;
pub use view::SharedView;

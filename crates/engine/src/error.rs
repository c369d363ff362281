use crate::id::{ItemId, ViewId};

/// Errors raised by store and view operations.
///
/// Operations that can fail softly (removing an absent value, looking up an
/// unknown child key) return `bool`/`Option` instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CascadeError {
	/// The value is already stored under another identity.
	#[error("value already present in store as {existing}")]
	DuplicateValue { existing: ItemId },

	/// A child view is already registered under this key.
	#[error("view key already registered: {key:?}")]
	DuplicateKey { key: String },

	/// No live item has this identity.
	#[error("item {0} not found")]
	ItemNotFound(ItemId),

	/// The view was removed, or the handle belongs to another store.
	#[error("{0} not found")]
	ViewNotFound(ViewId),

	/// The view's initial filter pass has not completed yet.
	#[error("{0} has not finished its initial pass")]
	NotInitialized(ViewId),

	/// An index or range fell outside the view.
	#[error("index {index} out of range for length {len}")]
	IndexOutOfRange { index: usize, len: usize },
}

/// Result alias for cascade operations.
pub type Result<T, E = CascadeError> = std::result::Result<T, E>;

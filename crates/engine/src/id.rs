//! Identifier types for stored items and views.

use std::fmt;

/// Stable identity of one live item in an [`IdentityStore`](crate::IdentityStore).
///
/// Identities survive sorting, moves and filtering. Once the item is removed
/// its identity may be handed out again by a later add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub(crate) usize);

impl ItemId {
	/// Returns the raw slot number backing this identity.
	pub const fn get(self) -> usize {
		self.0
	}
}

impl fmt::Display for ItemId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Arena handle of one view in a cascade.
///
/// The generation distinguishes a view from a later view that reused the same
/// arena slot, so handles to removed views never alias live ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId {
	pub(crate) slot: usize,
	pub(crate) generation: u64,
}

impl ViewId {
	pub(crate) const fn new(slot: usize, generation: u64) -> Self {
		Self { slot, generation }
	}

	/// Returns the generation this handle was issued with.
	pub const fn generation(self) -> u64 {
		self.generation
	}
}

impl fmt::Display for ViewId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "view{}.{}", self.slot, self.generation)
	}
}

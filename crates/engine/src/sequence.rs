//! Ordered identity sequence with a dirty-sort cache.
//!
//! # Invariants
//!
//! - When neither `dirty` nor `reordered` is set and a sort is requested with
//!   the fingerprint of `last_rule`, the sequence is already in that order and
//!   the sort is skipped.
//! - Structural mutations (insert, remove, replace) set `dirty`. Only a full
//!   sort clears it.
//! - Explicit reordering (moves, range sorts) sets `reordered` and leaves
//!   `dirty` untouched; a later full sort clears both.

use crate::error::{CascadeError, Result};
use crate::id::ItemId;
use crate::rule::{RuleFingerprint, SortRule};

/// Ordered list of item identities used by every view.
pub struct OrderedIdSequence<T> {
	ids: Vec<ItemId>,
	dirty: bool,
	reordered: bool,
	last_rule: Option<SortRule<T>>,
}

impl<T> Default for OrderedIdSequence<T> {
	fn default() -> Self {
		Self {
			ids: Vec::new(),
			dirty: false,
			reordered: false,
			last_rule: None,
		}
	}
}

impl<T> OrderedIdSequence<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn ids(&self) -> &[ItemId] {
		&self.ids
	}

	pub fn get(&self, index: usize) -> Option<ItemId> {
		self.ids.get(index).copied()
	}

	pub fn contains(&self, id: ItemId) -> bool {
		self.ids.contains(&id)
	}

	pub fn index_of(&self, id: ItemId) -> Option<usize> {
		self.ids.iter().position(|&candidate| candidate == id)
	}

	/// Whether the sequence is known to be ordered by [`Self::last_rule`].
	pub fn is_sorted_cache_valid(&self) -> bool {
		!self.dirty && !self.reordered && self.last_rule.is_some()
	}

	pub fn is_dirty(&self) -> bool {
		self.dirty
	}

	/// The rule of the last completed full sort.
	pub fn last_rule(&self) -> Option<&SortRule<T>> {
		self.last_rule.as_ref()
	}

	pub fn mark_dirty(&mut self) {
		self.dirty = true;
	}

	/// Appends `id` and returns its index.
	pub fn insert(&mut self, id: ItemId) -> usize {
		self.ids.push(id);
		self.dirty = true;
		self.ids.len() - 1
	}

	/// Removes `id`, returning the index it occupied.
	pub fn remove_id(&mut self, id: ItemId) -> Option<usize> {
		let index = self.index_of(id)?;
		self.ids.remove(index);
		self.dirty = true;
		Some(index)
	}

	/// Removes the identity at `index`.
	pub fn remove_at(&mut self, index: usize) -> Result<ItemId> {
		self.check_index(index)?;
		self.dirty = true;
		Ok(self.ids.remove(index))
	}

	/// Keeps only identities for which `keep` returns true. Returns how many
	/// were dropped.
	pub fn retain(&mut self, mut keep: impl FnMut(ItemId) -> bool) -> usize {
		let before = self.ids.len();
		self.ids.retain(|&id| keep(id));
		let dropped = before - self.ids.len();
		if dropped > 0 {
			self.dirty = true;
		}
		dropped
	}

	/// Inserts `id` at the position the last sort rule assigns it, without
	/// marking the sequence dirty. Equal values land after existing ones.
	///
	/// Without a previous sort there is no rule to search with, so the id is
	/// appended as by [`Self::insert`].
	pub fn insert_in_order<'a>(&mut self, id: ItemId, value_of: impl Fn(ItemId) -> &'a T) -> usize
	where
		T: 'a,
	{
		let index = match &self.last_rule {
			Some(rule) => {
				let value = value_of(id);
				self.ids
					.partition_point(|&existing| rule.compare(value_of(existing), value).is_le())
			}
			None => return self.insert(id),
		};
		self.ids.insert(index, id);
		index
	}

	/// Whether a full sort under a rule with `fingerprint` would do any work.
	pub fn needs_sort(&self, fingerprint: RuleFingerprint) -> bool {
		self.dirty || self.reordered || self.last_rule.as_ref().is_none_or(|rule| rule.fingerprint() != fingerprint)
	}

	/// Stable full sort under `rule`. Returns false when the cache proves the
	/// sequence is already in that order.
	pub fn sort<'a>(&mut self, rule: &SortRule<T>, value_of: impl Fn(ItemId) -> &'a T) -> bool
	where
		T: 'a,
	{
		if !self.needs_sort(rule.fingerprint()) {
			return false;
		}
		self.ids.sort_by(|&a, &b| rule.compare(value_of(a), value_of(b)));
		self.dirty = false;
		self.reordered = false;
		self.last_rule = Some(rule.clone());
		true
	}

	/// Repeats the last full sort. Returns false when there is no previous
	/// rule or the cache is still valid.
	pub fn redo_last_sort<'a>(&mut self, value_of: impl Fn(ItemId) -> &'a T) -> bool
	where
		T: 'a,
	{
		let Some(rule) = self.last_rule.clone() else {
			return false;
		};
		self.sort(&rule, value_of)
	}

	/// Sorts `count` identities starting at `index` under `rule`. The cached
	/// rule is kept but no longer trusted.
	pub fn sort_range<'a>(&mut self, index: usize, count: usize, rule: &SortRule<T>, value_of: impl Fn(ItemId) -> &'a T) -> Result<()>
	where
		T: 'a,
	{
		let end = index
			.checked_add(count)
			.filter(|&end| end <= self.ids.len())
			.ok_or(CascadeError::IndexOutOfRange {
				index: index.saturating_add(count),
				len: self.ids.len(),
			})?;
		if count > 1 {
			self.ids[index..end].sort_by(|&a, &b| rule.compare(value_of(a), value_of(b)));
			self.reordered = true;
		}
		Ok(())
	}

	/// Moves the identity at `from` so that it ends up at `to`, bypassing
	/// any rule.
	pub fn move_item(&mut self, from: usize, to: usize) -> Result<ItemId> {
		self.check_index(from)?;
		self.check_index(to)?;
		let id = self.ids.remove(from);
		self.ids.insert(to, id);
		if from != to {
			self.reordered = true;
		}
		Ok(id)
	}

	fn check_index(&self, index: usize) -> Result<()> {
		if index < self.ids.len() {
			Ok(())
		} else {
			Err(CascadeError::IndexOutOfRange {
				index,
				len: self.ids.len(),
			})
		}
	}
}

impl<T> std::fmt::Debug for OrderedIdSequence<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OrderedIdSequence")
			.field("ids", &self.ids)
			.field("dirty", &self.dirty)
			.field("reordered", &self.reordered)
			.field("last_rule", &self.last_rule)
			.finish()
	}
}

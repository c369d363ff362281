//! Predicates and ordering rules.
//!
//! Both are opaque callables behind trait objects. Ordering rules carry a
//! [`RuleFingerprint`] so a sequence can tell whether a requested sort uses
//! the same rule it was last sorted with; the fingerprint is the identity of
//! the shared callable, never its structure.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Membership test applied by a view to each candidate value.
pub trait Predicate<T>: Send + Sync {
	fn matches(&self, value: &T) -> bool;
}

impl<T, F> Predicate<T> for F
where
	F: Fn(&T) -> bool + Send + Sync,
{
	fn matches(&self, value: &T) -> bool {
		self(value)
	}
}

/// Three-way comparison used to order a view.
pub trait Comparator<T>: Send + Sync {
	fn compare(&self, a: &T, b: &T) -> Ordering;
}

impl<T, F> Comparator<T> for F
where
	F: Fn(&T, &T) -> Ordering + Send + Sync,
{
	fn compare(&self, a: &T, b: &T) -> Ordering {
		self(a, b)
	}
}

/// A view's membership test. `Filter::all()` admits everything without
/// calling anything.
pub struct Filter<T> {
	pred: Option<Arc<dyn Predicate<T>>>,
}

impl<T> Filter<T> {
	/// Filter admitting every value.
	pub fn all() -> Self {
		Self { pred: None }
	}

	/// Filter backed by `pred`.
	pub fn new(pred: impl Predicate<T> + 'static) -> Self {
		Self { pred: Some(Arc::new(pred)) }
	}

	/// Filter backed by an already shared predicate.
	pub fn from_arc(pred: Arc<dyn Predicate<T>>) -> Self {
		Self { pred: Some(pred) }
	}

	/// Returns true for the match-everything filter.
	pub fn is_all(&self) -> bool {
		self.pred.is_none()
	}

	pub fn matches(&self, value: &T) -> bool {
		self.pred.as_ref().is_none_or(|pred| pred.matches(value))
	}
}

impl<T> Default for Filter<T> {
	fn default() -> Self {
		Self::all()
	}
}

impl<T> Clone for Filter<T> {
	fn clone(&self) -> Self {
		Self { pred: self.pred.clone() }
	}
}

impl<T> fmt::Debug for Filter<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.pred {
			None => f.write_str("Filter::all"),
			Some(_) => f.write_str("Filter(..)"),
		}
	}
}

/// Identity of an ordering rule, compared by the dirty-sort cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleFingerprint {
	/// `Ord` ascending. Every natural rule shares this fingerprint.
	Natural,
	/// `Ord` descending.
	NaturalReversed,
	/// Address of a shared comparator; clones of one rule share it.
	Callable(usize),
}

/// A shareable ordering rule.
pub struct SortRule<T> {
	cmp: Arc<dyn Comparator<T>>,
	fingerprint: RuleFingerprint,
}

impl<T> SortRule<T> {
	/// Rule backed by `cmp`. Each call yields a distinct fingerprint; clone
	/// the rule to reuse it.
	pub fn new(cmp: impl Comparator<T> + 'static) -> Self {
		Self::from_arc(Arc::new(cmp))
	}

	/// Rule backed by an already shared comparator, fingerprinted by its address.
	pub fn from_arc(cmp: Arc<dyn Comparator<T>>) -> Self {
		let fingerprint = RuleFingerprint::Callable(Arc::as_ptr(&cmp).cast::<()>() as usize);
		Self { cmp, fingerprint }
	}

	pub fn fingerprint(&self) -> RuleFingerprint {
		self.fingerprint
	}

	pub fn compare(&self, a: &T, b: &T) -> Ordering {
		self.cmp.compare(a, b)
	}
}

impl<T: 'static> SortRule<T> {
	/// Orders by a derived key.
	pub fn by_key<K, F>(key: F) -> Self
	where
		K: Ord,
		F: Fn(&T) -> K + Send + Sync + 'static,
	{
		Self::new(move |a: &T, b: &T| key(a).cmp(&key(b)))
	}

	/// The same rule, descending.
	pub fn reversed(&self) -> Self {
		match self.fingerprint {
			RuleFingerprint::Natural => Self {
				cmp: flip(self.cmp.clone()),
				fingerprint: RuleFingerprint::NaturalReversed,
			},
			RuleFingerprint::NaturalReversed => Self {
				cmp: flip(self.cmp.clone()),
				fingerprint: RuleFingerprint::Natural,
			},
			RuleFingerprint::Callable(_) => Self::from_arc(flip(self.cmp.clone())),
		}
	}
}

impl<T: Ord + 'static> SortRule<T> {
	/// Ascending by `Ord`.
	pub fn natural() -> Self {
		Self {
			cmp: Arc::new(|a: &T, b: &T| a.cmp(b)),
			fingerprint: RuleFingerprint::Natural,
		}
	}
}

fn flip<T: 'static>(cmp: Arc<dyn Comparator<T>>) -> Arc<dyn Comparator<T>> {
	Arc::new(move |a: &T, b: &T| cmp.compare(b, a))
}

impl<T> Clone for SortRule<T> {
	fn clone(&self) -> Self {
		Self {
			cmp: self.cmp.clone(),
			fingerprint: self.fingerprint,
		}
	}
}

impl<T> fmt::Debug for SortRule<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SortRule").field("fingerprint", &self.fingerprint).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn natural_rules_share_fingerprint() {
		assert_eq!(SortRule::<i32>::natural().fingerprint(), SortRule::<i32>::natural().fingerprint());
	}

	#[test]
	fn callable_fingerprint_follows_clones() {
		let rule = SortRule::new(|a: &i32, b: &i32| b.cmp(a));
		let other = SortRule::new(|a: &i32, b: &i32| b.cmp(a));
		assert_eq!(rule.fingerprint(), rule.clone().fingerprint());
		assert_ne!(rule.fingerprint(), other.fingerprint());
	}

	#[test]
	fn reversed_natural_round_trips_fingerprint() {
		let rule = SortRule::<i32>::natural().reversed();
		assert_eq!(rule.fingerprint(), RuleFingerprint::NaturalReversed);
		assert_eq!(rule.compare(&1, &2), Ordering::Greater);
		assert_eq!(rule.reversed().fingerprint(), RuleFingerprint::Natural);
	}

	#[test]
	fn all_filter_admits_everything() {
		let all = Filter::<i32>::all();
		let even = Filter::new(|v: &i32| v % 2 == 0);
		assert!(all.is_all() && all.matches(&7));
		assert!(!even.is_all());
		assert!(even.matches(&4) && !even.matches(&7));
	}
}

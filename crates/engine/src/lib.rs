//! Cascading filter and sort views over a stable-identity store.
//!
//! An [`IdentityStore`] owns the items and hands out [`ItemId`]s that survive
//! sorting, moving and filtering. Views derived from the store hold only the
//! identities their filter admits, are kept up to date incrementally as the
//! store changes, and can be filtered again into child views.
//!
//! ```
//! use cascade_engine::{IdentityStore, ViewSpec};
//!
//! let mut store = IdentityStore::new();
//! let evens = store.add_view("evens", ViewSpec::new().filter(|v: &i32| v % 2 == 0)).unwrap();
//! for value in [4, 7, 2] {
//! 	store.add(value).unwrap();
//! }
//! assert_eq!(store.view(evens).unwrap().to_vec(), vec![4, 2]);
//! ```

/// Error taxonomy and result alias.
pub mod error;
/// Item and view identifiers.
pub mod id;
/// Change notifications and dispatchers.
pub mod notify;
/// Engine options.
pub mod options;
/// Predicates and ordering rules.
pub mod rule;
/// Ordered identity sequences with the dirty-sort cache.
pub mod sequence;
/// The identity store at the root of a cascade.
pub mod store;
/// Filter views and their handles.
pub mod view;

pub use error::{CascadeError, Result};
pub use id::{ItemId, ViewId};
pub use notify::{BulkUpdate, ChangeNotifier, Dispatcher, InlineDispatcher, Job, SubscriptionId, ViewEvent};
pub use options::{CascadeOptions, InitMode, InsertPolicy};
pub use rule::{Comparator, Filter, Predicate, RuleFingerprint, SortRule};
pub use sequence::OrderedIdSequence;
pub use store::{IdentityStore, Item};
pub use view::{ViewMut, ViewRef, ViewSpec, ViewState};

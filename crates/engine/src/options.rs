//! Engine options.
//!
//! Options are plain data with serde defaults so an embedding application can
//! carry them inside its own configuration file.

use serde::Deserialize;

/// How newly admitted identities enter a view's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertPolicy {
	/// Append at the end and mark the sequence unsorted.
	#[default]
	Append,
	/// Binary-search the position under the last sort rule and keep the
	/// sequence's sorted status.
	InOrder,
}

/// When a view runs its initial filter and sort pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitMode {
	/// Inline, before the view handle is returned.
	#[default]
	Inline,
	/// On a background task; reads wait until the pass completes.
	Background,
}

/// Defaults applied to views created in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct CascadeOptions {
	/// Insert policy for views that do not pick one explicitly.
	pub insert_policy: InsertPolicy,
	/// Initialization mode used by thread-safe handles.
	pub init: InitMode,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_table_uses_defaults() {
		let options: CascadeOptions = toml::from_str("").unwrap();
		assert_eq!(options, CascadeOptions::default());
	}

	#[test]
	fn parses_kebab_case_values() {
		let options: CascadeOptions = toml::from_str("insert-policy = \"in-order\"\ninit = \"background\"\n").unwrap();
		assert_eq!(options.insert_policy, InsertPolicy::InOrder);
		assert_eq!(options.init, InitMode::Background);
	}

	#[test]
	fn rejects_unknown_keys() {
		assert!(toml::from_str::<CascadeOptions>("threads = 4").is_err());
	}
}

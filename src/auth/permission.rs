//! Permission names and the hierarchical wildcard matching they obey.
//!
//! Stored permission names form a dot-hierarchy. A name ending in `.*` grants every
//! permission sharing its prefix, and the lone `*` grants everything. Resource-scoped
//! grants are stored as `<name>:<resource>` composites and only match when the check
//! supplies the same resource.

// std
use std::{borrow::Borrow, collections::hash_set, ops::Deref};
// self
use crate::_prelude::*;

const PERMISSION_MAX_LEN: usize = 128;

/// Error returned when permission name validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum PermissionPathError {
	/// The name was empty.
	#[error("Permission name cannot be empty.")]
	Empty,
	/// The name exceeded the allowed character count.
	#[error("Permission name exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
	/// Two consecutive dots, or a leading/trailing dot.
	#[error("Permission name contains an empty segment.")]
	EmptySegment,
	/// A `*` somewhere other than the final segment, or glued to other characters.
	#[error("Wildcard is only allowed as the final `.*` segment or the lone `*`.")]
	MisplacedWildcard,
	/// A character outside `[A-Za-z0-9_-]` in a regular segment.
	#[error("Permission name contains an invalid character: {character:?}.")]
	InvalidCharacter {
		/// The offending character.
		character: char,
	},
}

/// Validated permission name: dot-separated segments, optionally `.*`-suffixed, or the lone `*`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionPath(String);
impl PermissionPath {
	/// Creates a new permission name after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, PermissionPathError> {
		let view = value.as_ref();

		validate(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Returns true if this name grants a whole subtree (`.*` suffix or the lone `*`).
	pub fn is_wildcard(&self) -> bool {
		self.0 == "*" || self.0.ends_with(".*")
	}

	/// Returns the name as a plain string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Deref for PermissionPath {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for PermissionPath {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for PermissionPath {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<PermissionPath> for String {
	fn from(value: PermissionPath) -> Self {
		value.0
	}
}
impl TryFrom<String> for PermissionPath {
	type Error = PermissionPathError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate(&value)?;

		Ok(Self(value))
	}
}
impl Debug for PermissionPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Permission({})", self.0)
	}
}
impl Display for PermissionPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for PermissionPath {
	type Err = PermissionPathError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

/// A user's resolved permission entries, matched with hierarchical wildcard rules.
///
/// Entries are raw strings because resource-scoped grants (`name:resource`) and wildcards
/// coexist in one set; [`grants`](Self::grants) applies the match order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
	entries: HashSet<String>,
}
impl PermissionSet {
	/// Creates an empty set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a resolved entry.
	pub fn insert(&mut self, entry: impl Into<String>) {
		self.entries.insert(entry.into());
	}

	/// Number of resolved entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if no entries are present.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Returns true if the exact entry is present, without wildcard expansion.
	pub fn contains(&self, entry: &str) -> bool {
		self.entries.contains(entry)
	}

	/// Iterator over the raw entries.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|s| s.as_str())
	}

	/// Checks whether the set grants `permission`, in order: exact match, then each proper
	/// dot-prefix (longest to shortest) as `<prefix>.*` plus the lone `*`, then the
	/// `<permission>:<resource>` composite when a resource is supplied.
	pub fn grants(&self, permission: &str, resource: Option<&str>) -> bool {
		if self.entries.contains(permission) {
			return true;
		}

		let mut prefix = String::with_capacity(permission.len() + 2);
		let mut boundary = permission.len();

		while let Some(idx) = permission[..boundary].rfind('.') {
			boundary = idx;

			prefix.clear();
			prefix.push_str(&permission[..boundary]);
			prefix.push_str(".*");

			if self.entries.contains(prefix.as_str()) {
				return true;
			}
		}

		if self.entries.contains("*") {
			return true;
		}

		resource
			.is_some_and(|resource| self.entries.contains(format!("{permission}:{resource}").as_str()))
	}
}
impl FromIterator<String> for PermissionSet {
	fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
		Self { entries: iter.into_iter().collect() }
	}
}
impl<'a> IntoIterator for &'a PermissionSet {
	type IntoIter = hash_set::Iter<'a, String>;
	type Item = &'a String;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.iter()
	}
}

fn validate(view: &str) -> Result<(), PermissionPathError> {
	if view.is_empty() {
		return Err(PermissionPathError::Empty);
	}
	if view.len() > PERMISSION_MAX_LEN {
		return Err(PermissionPathError::TooLong { max: PERMISSION_MAX_LEN });
	}
	if view == "*" {
		return Ok(());
	}

	let last = view.split('.').count() - 1;

	for (index, segment) in view.split('.').enumerate() {
		if segment.is_empty() {
			return Err(PermissionPathError::EmptySegment);
		}
		if segment.contains('*') {
			if segment == "*" && index == last {
				continue;
			}

			return Err(PermissionPathError::MisplacedWildcard);
		}
		if let Some(character) =
			segment.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '-')
		{
			return Err(PermissionPathError::InvalidCharacter { character });
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn set_of(entries: &[&str]) -> PermissionSet {
		entries.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn validation_accepts_paths_and_wildcards() {
		for name in ["user.manage", "marketplace.trendyol.read", "marketplace.*", "*", "api_v2.x"] {
			PermissionPath::new(name)
				.unwrap_or_else(|e| panic!("`{name}` should be a valid permission name: {e}"));
		}
	}

	#[test]
	fn validation_rejects_malformed_names() {
		assert_eq!(PermissionPath::new(""), Err(PermissionPathError::Empty));
		assert_eq!(PermissionPath::new("a..b"), Err(PermissionPathError::EmptySegment));
		assert_eq!(PermissionPath::new(".a"), Err(PermissionPathError::EmptySegment));
		assert_eq!(PermissionPath::new("a."), Err(PermissionPathError::EmptySegment));
		assert_eq!(PermissionPath::new("a.*.b"), Err(PermissionPathError::MisplacedWildcard));
		assert_eq!(PermissionPath::new("a*"), Err(PermissionPathError::MisplacedWildcard));
		assert_eq!(
			PermissionPath::new("a.b c"),
			Err(PermissionPathError::InvalidCharacter { character: ' ' })
		);
		assert_eq!(
			PermissionPath::new("a:b"),
			Err(PermissionPathError::InvalidCharacter { character: ':' })
		);
	}

	#[test]
	fn wildcard_flag_detects_subtree_grants() {
		assert!(PermissionPath::new("marketplace.*").unwrap().is_wildcard());
		assert!(PermissionPath::new("*").unwrap().is_wildcard());
		assert!(!PermissionPath::new("marketplace.view").unwrap().is_wildcard());
	}

	#[test]
	fn grants_matches_exact_then_prefixes() {
		let exact = set_of(&["marketplace.trendyol.read"]);
		let mid = set_of(&["marketplace.trendyol.*"]);
		let top = set_of(&["marketplace.*"]);
		let unrelated = set_of(&["marketplace.amazon.*", "user.manage"]);

		for set in [&exact, &mid, &top] {
			assert!(set.grants("marketplace.trendyol.read", None));
		}

		assert!(!unrelated.grants("marketplace.trendyol.read", None));
	}

	#[test]
	fn wildcard_does_not_match_its_own_stem() {
		// `marketplace.trendyol.read.*` only covers names below the stem.
		let set = set_of(&["marketplace.trendyol.read.*"]);

		assert!(!set.grants("marketplace.trendyol.read", None));
		assert!(set.grants("marketplace.trendyol.read.archive", None));
	}

	#[test]
	fn global_star_grants_everything() {
		let set = set_of(&["*"]);

		assert!(set.grants("system.admin", None));
		assert!(set.grants("anything", Some("resource")));
	}

	#[test]
	fn resource_composites_require_the_resource() {
		let set = set_of(&["document.read:invoice"]);

		assert!(set.grants("document.read", Some("invoice")));
		assert!(!set.grants("document.read", Some("receipt")));
		assert!(!set.grants("document.read", None));
	}
}

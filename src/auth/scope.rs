//! Normalized OAuth scope sets.

// std
use std::{cmp::Ordering, collections::BTreeSet, sync::OnceLock};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Sorted, deduplicated set of OAuth scopes.
///
/// Equality, ordering, and hashing only look at the normalized list, so
/// `["cart.basic:write", "profile.compact"]` and its reverse are the same set. The
/// [`fingerprint`](Self::fingerprint) is a base64 (no padding) SHA-256 digest of the
/// space-joined list; stores use it to partition token records.
#[derive(Default)]
pub struct ScopeSet {
	scopes: Arc<[String]>,
	fingerprint: OnceLock<String>,
}
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut set = BTreeSet::new();

		for scope in scopes {
			let owned: String = scope.into();

			if owned.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if owned.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
			}

			set.insert(owned);
		}

		Ok(Self { scopes: set.into_iter().collect(), fingerprint: OnceLock::new() })
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Returns true if the set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.scopes.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(String::as_str)
	}

	/// Space-delimited representation used in OAuth requests.
	pub fn normalized(&self) -> String {
		self.scopes.join(" ")
	}

	/// Stable fingerprint derived from the normalized scope list (cached).
	pub fn fingerprint(&self) -> String {
		self.fingerprint.get_or_init(|| compute_fingerprint(&self.scopes)).clone()
	}
}
impl Clone for ScopeSet {
	fn clone(&self) -> Self {
		Self { scopes: self.scopes.clone(), fingerprint: self.fingerprint.clone() }
	}
}
impl PartialEq for ScopeSet {
	fn eq(&self, other: &Self) -> bool {
		self.scopes == other.scopes
	}
}
impl Eq for ScopeSet {}
impl PartialOrd for ScopeSet {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for ScopeSet {
	fn cmp(&self, other: &Self) -> Ordering {
		self.scopes.cmp(&other.scopes)
	}
}
impl Hash for ScopeSet {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.fingerprint.get_or_init(|| compute_fingerprint(&self.scopes)).hash(state);
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}
		if s.chars().all(char::is_whitespace) {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(s.split_whitespace())
	}
}
impl Serialize for ScopeSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.scopes.len()))?;

		for scope in self.scopes.iter() {
			seq.serialize_element(scope)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for ScopeSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		ScopeSet::new(values).map_err(DeError::custom)
	}
}

fn compute_fingerprint(scopes: &[String]) -> String {
	let mut hasher = Sha256::new();

	hasher.update(scopes.join(" ").as_bytes());

	STANDARD_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn kroger_scopes_normalize_and_hash_stably() {
		let lhs = ScopeSet::new(["profile.compact", "cart.basic:write", "cart.basic:write"])
			.expect("Left-hand scope set should be valid.");
		let rhs = ScopeSet::new(["cart.basic:write", "profile.compact"])
			.expect("Right-hand scope set should be valid.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.normalized(), "cart.basic:write profile.compact");
		assert_eq!(lhs.fingerprint(), rhs.fingerprint());
	}

	#[test]
	fn whitespace_and_blank_entries_are_rejected() {
		assert!(matches!(
			ScopeSet::new([" product.compact"]),
			Err(ScopeValidationError::ContainsWhitespace { .. })
		));
		assert_eq!(ScopeSet::new([""]), Err(ScopeValidationError::Empty));
		assert!(ScopeSet::from_str("").expect("Empty input is an empty set.").is_empty());
		assert!(ScopeSet::from_str("  ").is_err());
	}

	#[test]
	fn parses_space_delimited_strings() {
		let scopes = ScopeSet::from_str("product.compact  cart.basic:write")
			.expect("Scope string should parse successfully.");

		assert!(scopes.contains("product.compact"));
		assert!(!scopes.contains("profile.compact"));
		assert_eq!(scopes.iter().collect::<Vec<_>>(), vec!["cart.basic:write", "product.compact"]);
	}

	#[test]
	fn serde_uses_plain_arrays() {
		let scopes = ScopeSet::new(["product.compact"]).expect("Scope fixture should be valid.");
		let json = serde_json::to_string(&scopes).expect("Scope set should serialize.");

		assert_eq!(json, "[\"product.compact\"]");
		assert!(serde_json::from_str::<ScopeSet>("[\"bad scope\"]").is_err());
	}
}

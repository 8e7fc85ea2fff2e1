//! Token persistence: the [`TokenStore`] contract plus in-memory and file backends.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, Secret, TokenFamily, TokenRecord},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend for issued token records, keyed by family and scope.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the record for its family and scope.
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches the record for the family and scope, if present.
	fn fetch<'a>(
		&'a self,
		family: &'a TokenFamily,
		scope: &'a ScopeSet,
	) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Replaces the record only if its refresh token still equals `expected_refresh`.
	fn compare_and_swap_refresh<'a>(
		&'a self,
		family: &'a TokenFamily,
		scope: &'a ScopeSet,
		expected_refresh: Option<&'a str>,
		replacement: TokenRecord,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Marks the record revoked at `instant` and returns the updated copy.
	fn revoke<'a>(
		&'a self,
		family: &'a TokenFamily,
		scope: &'a ScopeSet,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>>;
}

/// Result of [`TokenStore::compare_and_swap_refresh`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// Refresh token matched and the record was replaced.
	Updated,
	/// A record exists but holds a different refresh token.
	RefreshMismatch,
	/// Nothing is stored under the key.
	Missing,
}

/// Errors surfaced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Snapshot could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Underlying storage failed.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Key under which a record is stored.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreKey {
	/// Token family component.
	pub family: TokenFamily,
	/// Scope fingerprint component.
	pub scope_fingerprint: String,
}
impl StoreKey {
	/// Builds the key for a family and scope.
	pub fn new(family: &TokenFamily, scope: &ScopeSet) -> Self {
		Self { family: family.clone(), scope_fingerprint: scope.fingerprint() }
	}

	/// Key of an existing record.
	pub fn of(record: &TokenRecord) -> Self {
		Self::new(&record.family, &record.scope)
	}
}

/// Applies compare-and-swap semantics to an in-memory map shared by both backends.
pub(crate) fn swap_if_refresh_matches(
	map: &mut HashMap<StoreKey, TokenRecord>,
	key: StoreKey,
	expected_refresh: Option<&str>,
	replacement: TokenRecord,
) -> CompareAndSwapOutcome {
	let outcome = match map.get(&key) {
		Some(existing) if refresh_matches(existing.refresh_token.as_ref(), expected_refresh) =>
			CompareAndSwapOutcome::Updated,
		Some(_) => CompareAndSwapOutcome::RefreshMismatch,
		None => CompareAndSwapOutcome::Missing,
	};

	if outcome == CompareAndSwapOutcome::Updated {
		map.insert(key, replacement);
	}

	outcome
}

fn refresh_matches(current: Option<&Secret>, expected: Option<&str>) -> bool {
	match (current.map(Secret::expose), expected) {
		(None, None) => true,
		(Some(current), Some(expected)) => current == expected,
		_ => false,
	}
}

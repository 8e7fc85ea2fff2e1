//! Process-local [`TokenStore`] used by tests and short-lived tools.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenFamily, TokenRecord},
	store::{self, CompareAndSwapOutcome, StoreFuture, StoreKey, TokenStore},
};

/// Keeps records in a shared map; clones observe the same data.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<HashMap<StoreKey, TokenRecord>>>);
impl MemoryStore {
	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl TokenStore for MemoryStore {
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.0.write().insert(StoreKey::of(&record), record);

			Ok(())
		})
	}

	fn fetch<'a>(
		&'a self,
		family: &'a TokenFamily,
		scope: &'a ScopeSet,
	) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { Ok(self.0.read().get(&StoreKey::new(family, scope)).cloned()) })
	}

	fn compare_and_swap_refresh<'a>(
		&'a self,
		family: &'a TokenFamily,
		scope: &'a ScopeSet,
		expected_refresh: Option<&'a str>,
		replacement: TokenRecord,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let mut map = self.0.write();

			Ok(store::swap_if_refresh_matches(
				&mut map,
				StoreKey::new(family, scope),
				expected_refresh,
				replacement,
			))
		})
	}

	fn revoke<'a>(
		&'a self,
		family: &'a TokenFamily,
		scope: &'a ScopeSet,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move {
			let mut map = self.0.write();

			Ok(map.get_mut(&StoreKey::new(family, scope)).map(|record| {
				record.revoke(instant);

				record.clone()
			}))
		})
	}
}

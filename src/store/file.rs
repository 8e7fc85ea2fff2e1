//! JSON-file [`TokenStore`] backing the user token file.
//!
//! The whole map is rewritten after every mutation through a temp file that is synced and
//! renamed over the target, so a crash never leaves a half-written token file behind.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenFamily, TokenRecord},
	store::{self, CompareAndSwapOutcome, StoreError, StoreFuture, StoreKey, TokenStore},
};

type Snapshot = HashMap<StoreKey, TokenRecord>;

/// Persists records to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileStore {
	/// Opens the store at `path`, loading any existing snapshot.
	///
	/// A missing or empty file yields an empty store; the file is only created on the first
	/// write.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();
		let snapshot = load_snapshot(&path)?;

		tracing::debug!(path = %path.display(), records = snapshot.len(), "opened token file");

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the token file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| backend("create directory", parent, e))?;
		}

		let entries = snapshot.iter().collect::<Vec<_>>();
		let bytes = serde_json::to_vec_pretty(&entries).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize token snapshot: {e}"),
		})?;
		let tmp = self.path.with_extension("tmp");
		let written = File::create(&tmp)
			.map_err(|e| backend("create", &tmp, e))
			.and_then(|mut file| {
				file.write_all(&bytes).map_err(|e| backend("write", &tmp, e))?;
				file.sync_all().map_err(|e| backend("sync", &tmp, e))
			})
			.and_then(|()| fs::rename(&tmp, &self.path).map_err(|e| backend("replace", &self.path, e)));

		if written.is_err() {
			let _ = fs::remove_file(&tmp);
		}

		written
	}
}
impl TokenStore for FileStore {
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(StoreKey::of(&record), record);

			self.persist(&guard)
		})
	}

	fn fetch<'a>(
		&'a self,
		family: &'a TokenFamily,
		scope: &'a ScopeSet,
	) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { Ok(self.inner.read().get(&StoreKey::new(family, scope)).cloned()) })
	}

	fn compare_and_swap_refresh<'a>(
		&'a self,
		family: &'a TokenFamily,
		scope: &'a ScopeSet,
		expected_refresh: Option<&'a str>,
		replacement: TokenRecord,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let outcome = store::swap_if_refresh_matches(
				&mut guard,
				StoreKey::new(family, scope),
				expected_refresh,
				replacement,
			);

			if outcome == CompareAndSwapOutcome::Updated {
				self.persist(&guard)?;
			}

			Ok(outcome)
		})
	}

	fn revoke<'a>(
		&'a self,
		family: &'a TokenFamily,
		scope: &'a ScopeSet,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let Some(record) = guard.get_mut(&StoreKey::new(family, scope)) else {
				return Ok(None);
			};

			record.revoke(instant);

			let revoked = record.clone();

			self.persist(&guard)?;

			Ok(Some(revoked))
		})
	}
}

fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::new()),
		Err(e) => return Err(backend("read", path, e)),
	};

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(Snapshot::new());
	}

	let entries: Vec<(StoreKey, TokenRecord)> =
		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

	Ok(entries.into_iter().collect())
}

fn backend(action: &str, path: &Path, e: std::io::Error) -> StoreError {
	StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}

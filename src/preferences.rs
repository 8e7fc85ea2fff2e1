//! Customer preferences persisted as a small JSON file.
//!
//! The file holds a JSON object such as `{ "preferred_location_id": "01400943" }`. Keys this
//! crate does not know about are carried through rewrites untouched.

// std
use std::{
	fs::{self, File},
	io::{self, Write},
	path::{Path, PathBuf},
};
// crates.io
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, auth::LocationId};

const PREFERRED_LOCATION_KEY: &str = "preferred_location_id";

/// Errors raised while persisting preferences.
#[derive(Debug, ThisError)]
pub enum PreferencesError {
	/// Reading or writing the file failed.
	#[error("Preferences file {} could not be {action}.", .path.display())]
	Io {
		/// Attempted operation.
		action: &'static str,
		/// File involved.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: io::Error,
	},
	/// Preferences could not be encoded.
	#[error("Preferences could not be serialized.")]
	Serialize(#[from] serde_json::Error),
	/// Re-reading the file after a write returned a different location.
	#[error(
		"Preferred location was not saved: expected {expected}, found {}.",
		.found.as_deref().unwrap_or("nothing")
	)]
	VerificationFailed {
		/// Location that was written.
		expected: LocationId,
		/// Location read back.
		found: Option<String>,
	},
}

/// Stored preferences.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
	/// Store the customer shops at by default.
	#[serde(default)]
	pub preferred_location_id: Option<LocationId>,
	/// Unknown keys preserved across rewrites.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Reads and writes [`Preferences`] at a fixed path.
#[derive(Clone, Debug)]
pub struct PreferencesStore {
	path: PathBuf,
}
impl PreferencesStore {
	/// Store backed by `path`; nothing is touched until the first call.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Location of the preferences file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Loads preferences, never failing.
	///
	/// A missing file is created with defaults. An empty file reads as defaults. An unreadable
	/// file or one that is not a JSON object is logged, replaced with defaults when possible,
	/// and read as defaults. A preferred location that is not a valid id reads as unset while
	/// every other key is kept.
	pub fn load(&self) -> Preferences {
		let contents = match fs::read_to_string(&self.path) {
			Ok(contents) => contents,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				if let Err(e) = self.save(&Preferences::default()) {
					tracing::warn!(error = %e, "could not create default preferences file");
				}

				return Preferences::default();
			},
			Err(e) => return self.recover(&e),
		};

		if contents.trim().is_empty() {
			return Preferences::default();
		}

		match serde_json::from_str::<Value>(&contents) {
			Ok(Value::Object(map)) => self.decode(map),
			Ok(_) => self.recover(&"top-level value is not a JSON object"),
			Err(e) => self.recover(&e),
		}
	}

	/// Writes preferences through a synced temp file renamed over the target.
	pub fn save(&self, preferences: &Preferences) -> Result<(), PreferencesError> {
		let io_err = |action, path: &Path| {
			let path = path.to_path_buf();

			move |source| PreferencesError::Io { action, path, source }
		};

		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(io_err("created", parent))?;
		}

		let bytes = serde_json::to_vec_pretty(preferences)?;
		let mut tmp = self.path.clone().into_os_string();

		tmp.push(".tmp");

		let tmp = PathBuf::from(tmp);
		let written = File::create(&tmp)
			.map_err(io_err("created", &tmp))
			.and_then(|mut file| {
				file.write_all(&bytes).map_err(io_err("written", &tmp))?;
				file.sync_all().map_err(io_err("synced", &tmp))
			})
			.and_then(|()| fs::rename(&tmp, &self.path).map_err(io_err("replaced", &self.path)));

		match written {
			Ok(()) => {
				tracing::debug!(path = %self.path.display(), "preferences saved");

				Ok(())
			},
			Err(e) => {
				let _ = fs::remove_file(&tmp);

				Err(e)
			},
		}
	}

	/// Preferred store location, if one was chosen.
	pub fn preferred_location_id(&self) -> Option<LocationId> {
		self.load().preferred_location_id
	}

	/// Records the preferred location and verifies the write by reading it back.
	pub fn set_preferred_location_id(&self, location_id: LocationId) -> Result<()> {
		let mut preferences = self.load();

		preferences.preferred_location_id = Some(location_id.clone());

		self.save(&preferences)?;

		let found = self.preferred_location_id();

		if found.as_ref() != Some(&location_id) {
			return Err(PreferencesError::VerificationFailed {
				expected: location_id,
				found: found.map(String::from),
			}
			.into());
		}

		tracing::info!(location_id = %location_id, "preferred location saved");

		Ok(())
	}

	fn decode(&self, mut extra: Map<String, Value>) -> Preferences {
		let preferred_location_id = match extra.remove(PREFERRED_LOCATION_KEY) {
			None | Some(Value::Null) => None,
			Some(Value::String(id)) => LocationId::new(id.as_str())
				.inspect_err(|e| {
					tracing::warn!(
						path = %self.path.display(),
						location_id = %id,
						error = %e,
						"ignoring invalid preferred location"
					);
				})
				.ok(),
			Some(other) => {
				tracing::warn!(
					path = %self.path.display(),
					location_id = %other,
					"ignoring preferred location that is not a string"
				);

				None
			},
		};

		Preferences { preferred_location_id, extra }
	}

	fn recover(&self, error: &dyn Display) -> Preferences {
		tracing::warn!(path = %self.path.display(), error = %error, "could not load preferences");

		if let Err(e) = self.save(&Preferences::default()) {
			tracing::warn!(error = %e, "could not recreate default preferences file");
		}

		Preferences::default()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn store(tag: &str) -> PreferencesStore {
		PreferencesStore::new(env::temp_dir().join(format!(
			"kroger_connect_prefs_{tag}_{}_{}/prefs.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		)))
	}

	fn cleanup(store: &PreferencesStore) {
		if let Some(dir) = store.path().parent() {
			let _ = fs::remove_dir_all(dir);
		}
	}

	fn location(id: &str) -> LocationId {
		LocationId::new(id).expect("Location fixture should be valid.")
	}

	#[test]
	fn missing_file_is_created_with_defaults() {
		let store = store("missing");

		assert_eq!(store.load(), Preferences::default());

		let written = fs::read_to_string(store.path()).expect("Default file should exist.");
		let value: Value = serde_json::from_str(&written).expect("Default file should be JSON.");

		assert_eq!(value, serde_json::json!({ "preferred_location_id": null }));

		cleanup(&store);
	}

	#[test]
	fn empty_and_corrupt_files_read_as_defaults() {
		let store = store("corrupt");

		fs::create_dir_all(store.path().parent().expect("Fixture path should have a parent."))
			.expect("Fixture directory should be creatable.");
		fs::write(store.path(), "   \n").expect("Fixture file should be writable.");

		assert_eq!(store.load(), Preferences::default());

		fs::write(store.path(), "{\"preferred_location_id\": ")
			.expect("Fixture file should be writable.");

		assert_eq!(store.load(), Preferences::default());
		assert!(
			serde_json::from_str::<Preferences>(
				&fs::read_to_string(store.path()).expect("Recovered file should be readable.")
			)
			.is_ok(),
			"Corrupt file should be replaced with defaults."
		);

		cleanup(&store);
	}

	#[test]
	fn preferred_location_round_trips_and_keeps_unknown_keys() {
		let store = store("round_trip");

		fs::create_dir_all(store.path().parent().expect("Fixture path should have a parent."))
			.expect("Fixture directory should be creatable.");
		fs::write(store.path(), r#"{"theme":"dark","preferred_location_id":null}"#)
			.expect("Fixture file should be writable.");
		store
			.set_preferred_location_id(location("01400943"))
			.expect("Preferred location should be saved.");

		assert_eq!(store.preferred_location_id(), Some(location("01400943")));

		let prefs = store.load();

		assert_eq!(prefs.extra.get("theme"), Some(&Value::from("dark")));

		cleanup(&store);
	}

	#[test]
	fn malformed_location_id_is_dropped_without_touching_the_file() {
		let store = store("bad_location");

		fs::create_dir_all(store.path().parent().expect("Fixture path should have a parent."))
			.expect("Fixture directory should be creatable.");

		for contents in [
			r#"{"theme":"dark","preferred_location_id":"014-00943"}"#,
			r#"{"theme":"dark","preferred_location_id":1400943}"#,
		] {
			fs::write(store.path(), contents).expect("Fixture file should be writable.");

			let prefs = store.load();

			assert_eq!(prefs.preferred_location_id, None);
			assert_eq!(prefs.extra.get("theme"), Some(&Value::from("dark")));
			assert!(!prefs.extra.contains_key(PREFERRED_LOCATION_KEY));
			assert_eq!(
				fs::read_to_string(store.path()).expect("Fixture file should be readable."),
				contents,
				"A well-formed file must not be rewritten on load."
			);
		}

		store
			.set_preferred_location_id(location("01400943"))
			.expect("Preferred location should replace the malformed one.");

		let prefs = store.load();

		assert_eq!(prefs.preferred_location_id, Some(location("01400943")));
		assert_eq!(prefs.extra.get("theme"), Some(&Value::from("dark")));

		cleanup(&store);
	}

	#[test]
	fn non_object_file_is_replaced_with_defaults() {
		let store = store("array");

		fs::create_dir_all(store.path().parent().expect("Fixture path should have a parent."))
			.expect("Fixture directory should be creatable.");
		fs::write(store.path(), "[1, 2]").expect("Fixture file should be writable.");

		assert_eq!(store.load(), Preferences::default());

		let value: Value = serde_json::from_str(
			&fs::read_to_string(store.path()).expect("Recovered file should be readable."),
		)
		.expect("Recovered file should be JSON.");

		assert_eq!(value, serde_json::json!({ "preferred_location_id": null }));

		cleanup(&store);
	}
}

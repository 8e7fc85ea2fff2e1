//! Kroger developer application settings read from the environment.
//!
//! | Key | Required | Default |
//! |---|---|---|
//! | `KROGER_CLIENT_ID` | yes | |
//! | `KROGER_CLIENT_SECRET` | yes | |
//! | `KROGER_REDIRECT_URI` | yes | conventionally `http://localhost:8000/callback` |
//! | `KROGER_USER_ZIP_CODE` | no | `90274` |
//! | `KROGER_TOKEN_FILE` | no | `.kroger_token_user.json` |
//! | `KROGER_PREFERENCES_FILE` | no | `~/.kroger_mcp_preferences.json` |
//!
//! Values are kept byte-for-byte as supplied. An empty required value counts as missing, and
//! every missing key is reported at once so a misconfigured deployment fails on start.

mod zip;

pub use zip::ZipCode;

// std
use std::{
	fs,
	path::{Path, PathBuf},
};
// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// Application identifier issued by the Kroger developer portal.
pub const ENV_CLIENT_ID: &str = "KROGER_CLIENT_ID";
/// Application secret issued by the Kroger developer portal.
pub const ENV_CLIENT_SECRET: &str = "KROGER_CLIENT_SECRET";
/// Callback registered for the application.
pub const ENV_REDIRECT_URI: &str = "KROGER_REDIRECT_URI";
/// Postal code used when a location search names none.
pub const ENV_USER_ZIP_CODE: &str = "KROGER_USER_ZIP_CODE";
/// Override for the user token file.
pub const ENV_TOKEN_FILE: &str = "KROGER_TOKEN_FILE";
/// Override for the preferences file.
pub const ENV_PREFERENCES_FILE: &str = "KROGER_PREFERENCES_FILE";

/// Redirect URI the developer portal setup conventionally registers.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8000/callback";
/// ZIP code used when `KROGER_USER_ZIP_CODE` is unset.
pub const DEFAULT_ZIP_CODE: &str = "90274";
/// User token file, relative to the working directory.
pub const DEFAULT_TOKEN_FILE: &str = ".kroger_token_user.json";
/// Preferences file name, placed in the home directory.
pub const DEFAULT_PREFERENCES_FILE_NAME: &str = ".kroger_mcp_preferences.json";

const REQUIRED: [&str; 3] = [ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_REDIRECT_URI];

/// Validated Kroger application settings.
#[derive(Clone)]
pub struct KrogerConfig {
	client_id: String,
	client_secret: Secret,
	redirect_uri: String,
	redirect_url: Url,
	zip_code: Option<ZipCode>,
	token_file: Option<String>,
	preferences_file: Option<String>,
}
impl KrogerConfig {
	/// Starts a programmatic configuration; [`KrogerConfigBuilder::build`] validates it.
	pub fn builder(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		redirect_uri: impl Into<String>,
	) -> KrogerConfigBuilder {
		KrogerConfigBuilder {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			redirect_uri: redirect_uri.into(),
			zip_code: None,
			token_file: None,
			preferences_file: None,
		}
	}

	/// Reads the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Loads `.env` from the working directory (or a parent) into the process environment,
	/// then reads it. Variables already set win over the file, and a missing file is fine.
	pub fn from_dotenv() -> Result<Self, ConfigError> {
		match dotenvy::dotenv() {
			Ok(path) => tracing::debug!(path = %path.display(), "loaded dotenv file"),
			Err(e) if e.not_found() => tracing::debug!("no dotenv file found"),
			Err(e) => return Err(ConfigError::Dotenv(e)),
		}

		Self::from_env()
	}

	/// Parses a dotenv file without touching the process environment.
	pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let env_file = |source| ConfigError::EnvFile { path: path.to_path_buf(), source };
		let mut vars = HashMap::new();

		for item in dotenvy::from_path_iter(path).map_err(env_file)? {
			let (key, value) = item.map_err(env_file)?;

			vars.insert(key, value);
		}

		Self::from_lookup(|key| vars.get(key).cloned())
	}

	/// Reads every key through `lookup`.
	///
	/// Required keys that are absent or empty are collected and reported together.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |key: &str| lookup(key).filter(|value| !value.is_empty());
		let missing = REQUIRED.into_iter().filter(|&key| read(key).is_none()).collect::<Vec<_>>();

		if !missing.is_empty() {
			tracing::error!(missing = ?missing, "Kroger configuration is incomplete");

			return Err(ConfigError::MissingVariables { names: missing });
		}

		let mut builder = Self::builder(
			read(ENV_CLIENT_ID).unwrap_or_default(),
			read(ENV_CLIENT_SECRET).unwrap_or_default(),
			read(ENV_REDIRECT_URI).unwrap_or_default(),
		);

		builder.zip_code = read(ENV_USER_ZIP_CODE);
		builder.token_file = read(ENV_TOKEN_FILE);
		builder.preferences_file = read(ENV_PREFERENCES_FILE);

		builder.build()
	}

	/// Application identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Application secret.
	pub fn client_secret(&self) -> &Secret {
		&self.client_secret
	}

	/// Redirect URI exactly as configured.
	pub fn redirect_uri(&self) -> &str {
		&self.redirect_uri
	}

	/// Redirect URI parsed for request building.
	pub fn redirect_url(&self) -> &Url {
		&self.redirect_url
	}

	/// Configured ZIP code, if any.
	pub fn configured_zip_code(&self) -> Option<&ZipCode> {
		self.zip_code.as_ref()
	}

	/// Configured ZIP code or [`DEFAULT_ZIP_CODE`].
	pub fn zip_code(&self) -> &str {
		self.zip_code_or(DEFAULT_ZIP_CODE)
	}

	/// Configured ZIP code or the caller's fallback.
	pub fn zip_code_or<'a>(&'a self, default: &'a str) -> &'a str {
		self.zip_code.as_ref().map_or(default, ZipCode::as_str)
	}

	/// Path of the user token file.
	pub fn token_file(&self) -> PathBuf {
		PathBuf::from(self.token_file.as_deref().unwrap_or(DEFAULT_TOKEN_FILE))
	}

	/// Path of the preferences file; defaults to the home directory.
	pub fn preferences_file(&self) -> Result<PathBuf, ConfigError> {
		match &self.preferences_file {
			Some(path) => Ok(PathBuf::from(path)),
			None => dirs::home_dir()
				.map(|home| home.join(DEFAULT_PREFERENCES_FILE_NAME))
				.ok_or(ConfigError::MissingHomeDirectory),
		}
	}

	/// Renders the settings in dotenv syntax.
	///
	/// Every value is single-quoted, which dotenv parsers read literally, so loading the
	/// output with [`from_env_file`](Self::from_env_file) yields identical strings. Values
	/// containing a single quote or line break cannot be expressed that way and are rejected.
	pub fn to_env_file_contents(&self) -> Result<String, ConfigError> {
		let mut out = String::new();
		let entries = [
			(ENV_CLIENT_ID, Some(self.client_id.as_str())),
			(ENV_CLIENT_SECRET, Some(self.client_secret.expose())),
			(ENV_REDIRECT_URI, Some(self.redirect_uri.as_str())),
			(ENV_USER_ZIP_CODE, self.zip_code.as_ref().map(ZipCode::as_str)),
			(ENV_TOKEN_FILE, self.token_file.as_deref()),
			(ENV_PREFERENCES_FILE, self.preferences_file.as_deref()),
		];

		for (key, value) in entries {
			let Some(value) = value else { continue };

			if value.contains(['\'', '\n', '\r']) {
				return Err(ConfigError::UnrepresentableValue { key });
			}

			out.push_str(&format!("{key}='{value}'\n"));
		}

		Ok(out)
	}

	/// Writes [`to_env_file_contents`](Self::to_env_file_contents) to `path`.
	pub fn write_env_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
		let path = path.as_ref();
		let contents = self.to_env_file_contents()?;

		fs::write(path, contents)
			.map_err(|source| ConfigError::EnvFileWrite { path: path.to_path_buf(), source })
	}
}
impl Debug for KrogerConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KrogerConfig")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("redirect_uri", &self.redirect_uri)
			.field("zip_code", &self.zip_code)
			.field("token_file", &self.token_file)
			.field("preferences_file", &self.preferences_file)
			.finish()
	}
}

/// Builder returned by [`KrogerConfig::builder`].
#[derive(Clone)]
pub struct KrogerConfigBuilder {
	client_id: String,
	client_secret: String,
	redirect_uri: String,
	zip_code: Option<String>,
	token_file: Option<String>,
	preferences_file: Option<String>,
}
impl KrogerConfigBuilder {
	/// Sets the default ZIP code.
	pub fn zip_code(mut self, zip_code: impl Into<String>) -> Self {
		self.zip_code = Some(zip_code.into());

		self
	}

	/// Overrides the user token file location.
	pub fn token_file(mut self, path: impl Into<String>) -> Self {
		self.token_file = Some(path.into());

		self
	}

	/// Overrides the preferences file location.
	pub fn preferences_file(mut self, path: impl Into<String>) -> Self {
		self.preferences_file = Some(path.into());

		self
	}

	/// Validates the settings.
	pub fn build(self) -> Result<KrogerConfig, ConfigError> {
		let missing = [
			(ENV_CLIENT_ID, &self.client_id),
			(ENV_CLIENT_SECRET, &self.client_secret),
			(ENV_REDIRECT_URI, &self.redirect_uri),
		]
		.into_iter()
		.filter_map(|(key, value)| value.is_empty().then_some(key))
		.collect::<Vec<_>>();

		if !missing.is_empty() {
			return Err(ConfigError::MissingVariables { names: missing });
		}

		let redirect_url = Url::parse(&self.redirect_uri).map_err(|source| {
			ConfigError::InvalidRedirectUri { value: self.redirect_uri.clone(), source }
		})?;
		let zip_code = self.zip_code.map(ZipCode::new).transpose()?;
		let config = KrogerConfig {
			client_id: self.client_id,
			client_secret: Secret::new(self.client_secret),
			redirect_uri: self.redirect_uri,
			redirect_url,
			zip_code,
			token_file: self.token_file,
			preferences_file: self.preferences_file,
		};

		tracing::debug!(
			client_id = %config.client_id,
			client_secret = %config.client_secret,
			redirect_uri = %config.redirect_uri,
			zip_code = config.zip_code(),
			"loaded Kroger configuration"
		);

		Ok(config)
	}
}
impl Debug for KrogerConfigBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KrogerConfigBuilder")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("redirect_uri", &self.redirect_uri)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars = pairs
			.iter()
			.map(|(key, value)| (key.to_string(), value.to_string()))
			.collect::<HashMap<_, _>>();

		move |key: &str| vars.get(key).cloned()
	}

	fn complete() -> Vec<(&'static str, &'static str)> {
		vec![
			(ENV_CLIENT_ID, "kroger-app-1234"),
			(ENV_CLIENT_SECRET, "s3cr3t"),
			(ENV_REDIRECT_URI, DEFAULT_REDIRECT_URI),
		]
	}

	fn temp_path(tag: &str) -> PathBuf {
		env::temp_dir().join(format!(
			"kroger_connect_{tag}_{}_{}.env",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		))
	}

	#[test]
	fn every_missing_required_key_is_named() {
		let err = KrogerConfig::from_lookup(lookup(&[(ENV_CLIENT_SECRET, "s3cr3t")]))
			.expect_err("Missing keys should fail.");

		match &err {
			ConfigError::MissingVariables { names } =>
				assert_eq!(names, &[ENV_CLIENT_ID, ENV_REDIRECT_URI]),
			other => panic!("Unexpected error: {other:?}."),
		}

		let message = err.to_string();

		assert!(message.contains("KROGER_CLIENT_ID"));
		assert!(message.contains("KROGER_REDIRECT_URI"));
		assert!(!message.contains("KROGER_CLIENT_SECRET"));
	}

	#[test]
	fn empty_values_count_as_missing() {
		let mut pairs = complete();

		pairs[1] = (ENV_CLIENT_SECRET, "");

		assert!(matches!(
			KrogerConfig::from_lookup(lookup(&pairs)),
			Err(ConfigError::MissingVariables { names }) if names == [ENV_CLIENT_SECRET]
		));
	}

	#[test]
	fn optional_values_fall_back_to_defaults() {
		let config = KrogerConfig::from_lookup(lookup(&complete()))
			.expect("Required keys alone should be enough.");

		assert_eq!(config.zip_code(), "90274");
		assert_eq!(config.zip_code_or("10001"), "10001");
		assert!(config.configured_zip_code().is_none());
		assert_eq!(config.token_file(), PathBuf::from(".kroger_token_user.json"));
	}

	#[test]
	fn values_are_returned_verbatim() {
		let config = KrogerConfig::from_lookup(lookup(&[
			(ENV_CLIENT_ID, " Mixed-Case id "),
			(ENV_CLIENT_SECRET, "pa$$ #word\\"),
			(ENV_REDIRECT_URI, "HTTP://LOCALHOST:8000/callback/"),
			(ENV_USER_ZIP_CODE, "10001-0001"),
			(ENV_PREFERENCES_FILE, "/tmp/prefs.json"),
		]))
		.expect("Well-formed values should load.");

		assert_eq!(config.client_id(), " Mixed-Case id ");
		assert_eq!(config.client_secret().expose(), "pa$$ #word\\");
		assert_eq!(config.redirect_uri(), "HTTP://LOCALHOST:8000/callback/");
		assert_eq!(config.redirect_url().scheme(), "http");
		assert_eq!(config.zip_code(), "10001-0001");
		assert_eq!(
			config.preferences_file().expect("Explicit path should resolve."),
			PathBuf::from("/tmp/prefs.json")
		);
	}

	#[test]
	fn invalid_redirect_and_zip_are_rejected() {
		let mut pairs = complete();

		pairs[2] = (ENV_REDIRECT_URI, "/callback");

		assert!(matches!(
			KrogerConfig::from_lookup(lookup(&pairs)),
			Err(ConfigError::InvalidRedirectUri { .. })
		));

		let mut pairs = complete();

		pairs.push((ENV_USER_ZIP_CODE, "ABCDE"));

		assert!(matches!(
			KrogerConfig::from_lookup(lookup(&pairs)),
			Err(ConfigError::InvalidZipCode { value }) if value == "ABCDE"
		));
	}

	#[test]
	fn secret_never_shows_in_debug_output() {
		let config = KrogerConfig::from_lookup(lookup(&complete())).expect("Config should load.");
		let rendered = format!("{config:?}");

		assert!(!rendered.contains("s3cr3t"));
		assert!(rendered.contains("kroger-app-1234"));
	}

	#[test]
	fn env_file_round_trip_is_byte_identical() {
		let path = temp_path("round_trip");
		let original = KrogerConfig::builder(
			"id with spaces  ",
			"sec$ret \"quoted\" #hash \\n",
			"http://localhost:8000/callback?x=1&y=$HOME",
		)
		.zip_code("90274-1234")
		.token_file("tokens/user token.json")
		.build()
		.expect("Builder input should validate.");

		original.write_env_file(&path).expect("Env file should be written.");

		let reloaded = KrogerConfig::from_env_file(&path).expect("Env file should reload.");

		assert_eq!(reloaded.client_id(), original.client_id());
		assert_eq!(reloaded.client_secret().expose(), original.client_secret().expose());
		assert_eq!(reloaded.redirect_uri(), original.redirect_uri());
		assert_eq!(reloaded.configured_zip_code(), original.configured_zip_code());
		assert_eq!(reloaded.token_file(), original.token_file());
		assert_eq!(
			reloaded.to_env_file_contents().expect("Reloaded config should render."),
			original.to_env_file_contents().expect("Original config should render.")
		);

		fs::remove_file(&path).expect("Env file should be removable.");
	}

	#[test]
	fn unrepresentable_values_are_refused() {
		let config = KrogerConfig::builder("id", "it's", DEFAULT_REDIRECT_URI)
			.build()
			.expect("Builder input should validate.");

		assert!(matches!(
			config.to_env_file_contents(),
			Err(ConfigError::UnrepresentableValue { key: ENV_CLIENT_SECRET })
		));
	}

	#[test]
	fn unreadable_env_file_is_reported() {
		let path = temp_path("absent");

		assert!(matches!(KrogerConfig::from_env_file(&path), Err(ConfigError::EnvFile { .. })));
	}
}

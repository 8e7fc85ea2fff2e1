// std
use std::{env, fs, path::PathBuf, process};
// self
use kroger_connect::{
	config::{self, KrogerConfig},
	error::ConfigError,
};

fn template() -> PathBuf {
	PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".env.example")
}

fn temp_env_file(tag: &str, contents: &str) -> PathBuf {
	let path = env::temp_dir().join(format!("kroger_connect_{tag}_{}.env", process::id()));

	fs::write(&path, contents).expect("Env fixture should be writable.");

	path
}

#[test]
fn shipped_template_loads() {
	let config = KrogerConfig::from_env_file(template()).expect("Template should load.");

	assert_eq!(config.client_id(), "your_client_id");
	assert_eq!(config.client_secret().expose(), "your_client_secret");
	assert_eq!(config.redirect_uri(), config::DEFAULT_REDIRECT_URI);
	assert_eq!(config.zip_code(), config::DEFAULT_ZIP_CODE);
}

#[test]
fn commented_out_keys_are_reported_missing() {
	let path = temp_env_file(
		"commented",
		"# KROGER_CLIENT_ID=disabled\nKROGER_CLIENT_SECRET=s3cr3t\n#KROGER_REDIRECT_URI=\n",
	);
	let err = KrogerConfig::from_env_file(&path).expect_err("Commented keys should be missing.");

	fs::remove_file(&path).expect("Env fixture should be removable.");

	let ConfigError::MissingVariables { names } = &err else {
		panic!("Unexpected error: {err:?}.");
	};

	assert_eq!(names, &["KROGER_CLIENT_ID", "KROGER_REDIRECT_URI"]);
	assert!(err.to_string().contains("KROGER_CLIENT_ID"));
}

#[test]
fn written_file_reloads_identically() {
	let original = KrogerConfig::builder("id=with=equals", "se cret #1", config::DEFAULT_REDIRECT_URI)
		.zip_code("90210-1234")
		.build()
		.expect("Config should validate.");
	let path = temp_env_file("written", "");

	original.write_env_file(&path).expect("Env file should be written.");

	let written = fs::read_to_string(&path).expect("Env file should be readable.");
	let reloaded = KrogerConfig::from_env_file(&path).expect("Written file should reload.");

	fs::remove_file(&path).expect("Env fixture should be removable.");

	assert_eq!(reloaded.to_env_file_contents().expect("Reloaded config should render."), written);
	assert_eq!(reloaded.client_id(), "id=with=equals");
	assert_eq!(reloaded.client_secret().expose(), "se cret #1");
	assert_eq!(reloaded.zip_code(), "90210-1234");
}

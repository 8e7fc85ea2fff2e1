//! Fetches an application token for the credentials in `.env` and shows that a second call is
//! served from the session cache.
//!
//! Run with `RUST_LOG=kroger_connect=debug` to see the flow spans.

// crates.io
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
// self
use kroger_connect::{config::KrogerConfig, session::ReqwestSession};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let config = KrogerConfig::from_dotenv()?;
	let session = ReqwestSession::from_config(config)?;
	let first = session.app_token().await?;
	let second = session.app_token().await?;

	println!("Application token scopes: {}.", first.scope);
	println!("Application token expires at: {}.", first.expires_at);
	println!("Second call reused the cached token: {}.", first.access_token == second.access_token);
	println!("Default location search ZIP code: {}.", session.zip_code());

	Ok(())
}

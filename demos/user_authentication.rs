//! Interactive customer sign-in for cart and profile access.
//!
//! The demo prints the Kroger authorize URL, waits for the URL the browser was redirected to,
//! exchanges the code, and keeps the tokens in the configured token file. Running it again
//! reuses or refreshes the stored token instead of asking for another sign-in.

// std
use std::io::{self, Write};
// crates.io
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
// self
use kroger_connect::{
	auth::LocationId, config::KrogerConfig, error::Error, session::ReqwestSession,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let config = KrogerConfig::from_dotenv()?;
	let session = ReqwestSession::from_config(config)?;
	let token = match session.user_token().await {
		Ok(token) => {
			println!("Reusing the stored customer token.");

			token
		},
		Err(Error::AuthenticationRequired) => {
			let auth = session.start_authentication()?;

			println!("Open this URL and sign in with your Kroger account:");
			println!("{}", auth.authorize_url);
			println!(
				"After Kroger redirects to {}, paste the full URL from the address bar.",
				auth.redirect_uri
			);

			let callback = prompt("Callback URL")?;

			session.complete_authentication(auth, &callback).await?
		},
		Err(e) => return Err(e.into()),
	};

	println!("Customer token scopes: {}.", token.scope);
	println!("Customer token expires at: {}.", token.expires_at);
	println!("Refresh token issued: {}.", token.refresh_token.is_some());

	let preferences = session.preferences()?;

	match preferences.preferred_location_id() {
		Some(location_id) => println!("Preferred store: {location_id}."),
		None => {
			let input = prompt("Preferred store location ID (leave blank to skip)")?;

			if !input.is_empty() {
				preferences.set_preferred_location_id(LocationId::new(input)?)?;

				println!("Saved preferences to {}.", preferences.path().display());
			}
		},
	}

	Ok(())
}

fn prompt(message: &str) -> Result<String> {
	print!("{message}: ");

	io::stdout().flush()?;

	let mut input = String::new();

	io::stdin().read_line(&mut input)?;

	Ok(input.trim().to_owned())
}

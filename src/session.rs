//! Process-wide access to Kroger tokens.
//!
//! [`KrogerSession`] hands out application tokens for catalog and location calls and user
//! tokens for cart and profile calls. Both are cached in memory. User tokens come from the
//! token store when the cache is empty and are refreshed when they have lapsed; when nothing
//! usable is left the session answers [`Error::AuthenticationRequired`] and the customer has
//! to go through [`start_authentication`](KrogerSession::start_authentication) again.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenRecord},
	config::KrogerConfig,
	error::ConfigError,
	flows::{AuthorizationSession, CachedTokenRequest, TokenBroker},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	preferences::PreferencesStore,
	provider::kroger,
};
#[cfg(feature = "reqwest")]
use crate::{
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	store::{FileStore, TokenStore},
};

/// Session over the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestSession = KrogerSession<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Cached application and user tokens for one Kroger application.
pub struct KrogerSession<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	broker: TokenBroker<C, M>,
	config: KrogerConfig,
	app_token: Mutex<Option<TokenRecord>>,
	user_token: Mutex<Option<TokenRecord>>,
	force_app_refresh: AtomicBool,
}
impl<C, M> KrogerSession<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Wraps an existing broker.
	pub fn with_broker(broker: TokenBroker<C, M>, config: KrogerConfig) -> Self {
		Self {
			broker,
			config,
			app_token: Mutex::new(None),
			user_token: Mutex::new(None),
			force_app_refresh: AtomicBool::new(false),
		}
	}

	/// Settings the session was built from.
	pub fn config(&self) -> &KrogerConfig {
		&self.config
	}

	/// Underlying broker.
	pub fn broker(&self) -> &TokenBroker<C, M> {
		&self.broker
	}

	/// Default ZIP code for location searches.
	pub fn zip_code(&self) -> &str {
		self.config.zip_code()
	}

	/// Preferences file named by the configuration.
	pub fn preferences(&self) -> Result<PreferencesStore, ConfigError> {
		self.config.preferences_file().map(PreferencesStore::new)
	}

	/// Application token for public catalog and location data.
	pub async fn app_token(&self) -> Result<TokenRecord> {
		if let Some(token) = active(&self.app_token) {
			return Ok(token);
		}

		let force = self.force_app_refresh.swap(false, Ordering::AcqRel);
		let request = CachedTokenRequest::new(TokenKind::Application, kroger::application_scope())
			.with_force(force);
		let token = match self.broker.client_credentials(request).await {
			Ok(token) => token,
			Err(e) => {
				if force {
					self.force_app_refresh.store(true, Ordering::Release);
				}

				return Err(e);
			},
		};

		tracing::debug!(expires_at = %token.expires_at, "application token ready");

		*self.app_token.lock() = Some(token.clone());

		Ok(token)
	}

	/// User token for cart and profile calls.
	///
	/// Uses the cached token, then the stored one, then a refresh. A stored token that cannot be
	/// refreshed is still used while it has not expired. Rejected or failed refreshes end in
	/// [`Error::AuthenticationRequired`]; storage and configuration failures surface as-is.
	pub async fn user_token(&self) -> Result<TokenRecord> {
		if let Some(token) = active(&self.user_token) {
			return Ok(token);
		}

		let request = CachedTokenRequest::new(TokenKind::User, kroger::user_scope());
		let family = self.broker.family(TokenKind::User);
		let now = OffsetDateTime::now_utc();
		let token = match self.broker.store.fetch(&family, &request.scope).await? {
			Some(stored) if !request.should_refresh(&stored, now) => {
				tracing::debug!("using stored user token");

				stored
			},
			Some(stored) if stored.refresh_token.is_some() && !stored.is_revoked() => {
				tracing::info!("user token lapsed, refreshing");

				match self.broker.refresh_access_token(request.force_refresh()).await {
					Ok(token) => token,
					Err(e @ (Error::Storage(_) | Error::Config(_))) => return Err(e),
					Err(e) => {
						tracing::warn!(error = %e, "user token refresh failed");

						return Err(Error::AuthenticationRequired);
					},
				}
			},
			Some(stored) if stored.is_active() => {
				tracing::debug!("using stored user token close to expiry");

				stored
			},
			_ => {
				tracing::info!("no usable user token");

				return Err(Error::AuthenticationRequired);
			},
		};

		*self.user_token.lock() = Some(token.clone());

		Ok(token)
	}

	/// Drops the cached application token; the next call fetches a new one.
	pub fn invalidate_app_token(&self) {
		self.app_token.lock().take();
		self.force_app_refresh.store(true, Ordering::Release);
	}

	/// Drops the cached user token; the next call re-reads the token store.
	pub fn invalidate_user_token(&self) {
		self.user_token.lock().take();
	}

	/// Starts customer sign-in against the configured redirect URI.
	pub fn start_authentication(&self) -> Result<AuthorizationSession> {
		self.broker.start_authorization(kroger::user_scope(), self.config.redirect_url().clone())
	}

	/// Completes customer sign-in from the URL the browser was redirected to.
	pub async fn complete_authentication(
		&self,
		session: AuthorizationSession,
		callback_url: &str,
	) -> Result<TokenRecord> {
		let token = self.broker.complete_authorization(session, callback_url).await?;

		tracing::info!(expires_at = %token.expires_at, "customer signed in");

		*self.user_token.lock() = Some(token.clone());

		Ok(token)
	}
}
#[cfg(feature = "reqwest")]
impl KrogerSession<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Builds a session against `api.kroger.com`, persisting tokens in the configured file.
	pub fn from_config(config: KrogerConfig) -> Result<Self> {
		let store: Arc<dyn TokenStore> = Arc::new(FileStore::open(config.token_file())?);
		let broker = TokenBroker::new(store, kroger::descriptor()?, config.client_id())
			.with_client_secret(config.client_secret().clone());

		Ok(Self::with_broker(broker, config))
	}
}
impl<C, M> Debug for KrogerSession<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KrogerSession")
			.field("broker", &self.broker)
			.field("config", &self.config)
			.field("app_token_cached", &self.app_token.lock().is_some())
			.field("user_token_cached", &self.user_token.lock().is_some())
			.finish()
	}
}

fn active(slot: &Mutex<Option<TokenRecord>>) -> Option<TokenRecord> {
	slot.lock().as_ref().filter(|token| token.is_active()).cloned()
}

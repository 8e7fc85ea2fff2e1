//! Token flows coordinated by [`TokenBroker`].

pub mod auth_code_pkce;
pub mod common;
pub mod refresh;

mod client_credentials;

pub use auth_code_pkce::*;
pub use common::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{Secret, TokenFamily, TokenKind},
	error::ConfigError,
	http::TokenHttpClient,
	oauth::{BasicFacade, TransportErrorMapper},
	provider::{GrantType, ProviderDescriptor, ProviderStrategy, StandardStrategy},
	store::{StoreKey, TokenStore},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Broker over the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestBroker = TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Runs OAuth 2.0 grants against one provider and keeps the results in a [`TokenStore`].
///
/// Flows share the HTTP client, store, descriptor, and client credentials held here. Each
/// store key gets its own async guard so concurrent callers wait for one upstream request
/// instead of issuing their own.
#[derive(Clone)]
pub struct TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Transport used for every token endpoint call.
	pub http_client: Arc<C>,
	/// Maps transport failures into crate errors.
	pub transport_mapper: Arc<M>,
	/// Where issued tokens live.
	pub store: Arc<dyn TokenStore>,
	/// Provider endpoints and capabilities.
	pub descriptor: ProviderDescriptor,
	/// Classifies token endpoint failures and decorates requests.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// OAuth client identifier.
	pub client_id: String,
	/// Client secret for confidential authentication.
	pub client_secret: Option<Secret>,
	/// Counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	flow_guards: Arc<Mutex<HashMap<StoreKey, Arc<AsyncMutex<()>>>>>,
}
impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker over a caller-provided transport and error mapper.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			descriptor,
			strategy: Arc::new(StandardStrategy),
			client_id: client_id.into(),
			client_secret: None,
			refresh_metrics: Default::default(),
			flow_guards: Default::default(),
		}
	}

	/// Sets the client secret.
	pub fn with_client_secret(mut self, secret: impl Into<Secret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Replaces the error classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Token family for `kind`, stamped with this broker's provider.
	pub fn family(&self, kind: TokenKind) -> TokenFamily {
		TokenFamily::new(kind).with_provider(self.descriptor.id.clone())
	}

	pub(crate) fn facade(&self) -> Result<BasicFacade<C, M>> {
		BasicFacade::from_descriptor(
			&self.descriptor,
			&self.client_id,
			self.client_secret.as_ref().map(Secret::expose),
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)
	}

	pub(crate) fn ensure_supported(&self, grant: GrantType) -> Result<()> {
		if self.descriptor.supports(grant) {
			Ok(())
		} else {
			Err(ConfigError::UnsupportedGrant {
				descriptor: self.descriptor.id.to_string(),
				grant: grant.as_str(),
			}
			.into())
		}
	}
}
#[cfg(feature = "reqwest")]
impl TokenBroker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a broker with its own reqwest transport.
	pub fn new(
		store: Arc<dyn TokenStore>,
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
	) -> Self {
		Self::with_http_client(
			store,
			descriptor,
			client_id,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> Debug for TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBroker")
			.field("descriptor", &self.descriptor.id)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.finish()
	}
}

//! Facade over the `oauth2` crate plus transport error mapping.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenFamily, TokenRecord},
	error::{ConfigError, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{
		ClientAuthMethod, GrantType, ProviderDescriptor, ProviderErrorContext, ProviderErrorKind,
		ProviderStrategy,
	},
};

type ConfiguredClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(
		&self,
		grant: GrantType,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_grant: GrantType,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => {
				let inner = *inner;

				if inner.is_builder() {
					ConfigError::from(inner).into()
				} else if inner.is_timeout() {
					TransientError::TokenEndpoint {
						message: "Request timed out while calling the token endpoint".into(),
						status: meta_status(meta).or_else(|| inner.status().map(|s| s.as_u16())),
						retry_after: meta_retry_after(meta),
					}
					.into()
				} else {
					TransportError::from(inner).into()
				}
			},
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => transient(meta, format!("HTTP client error: {message}")),
			_ => transient(meta, "HTTP client error".into()),
		}
	}
}

/// Grant-level operations the flows need from an OAuth client.
pub(crate) trait OAuth2Facade {
	fn exchange_client_credentials<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		family: TokenFamily,
		scope: &'a ScopeSet,
		extra_params: &'a [(String, String)],
	) -> FacadeFuture<'a, TokenRecord>;

	fn refresh_token<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		family: TokenFamily,
		refresh_token: &'a str,
		scope: &'a ScopeSet,
	) -> FacadeFuture<'a, (TokenRecord, Option<String>)>;

	fn exchange_authorization_code<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		family: TokenFamily,
		code: &'a str,
		pkce_verifier: &'a str,
		scope: &'a ScopeSet,
		redirect_uri: &'a Url,
	) -> FacadeFuture<'a, TokenRecord>;
}

/// [`OAuth2Facade`] backed by `oauth2::basic::BasicClient`.
pub(crate) struct BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	client: ConfiguredClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		client_secret: Option<&str>,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url);

		match (descriptor.client_auth_method, client_secret) {
			(ClientAuthMethod::NoneWithPkce, _) | (_, None) => {},
			(ClientAuthMethod::ClientSecretBasic, Some(secret)) => {
				client = client.set_client_secret(ClientSecret::new(secret.to_owned()));
			},
			(ClientAuthMethod::ClientSecretPost, Some(secret)) => {
				client = client
					.set_client_secret(ClientSecret::new(secret.to_owned()))
					.set_auth_type(AuthType::RequestBody);
			},
		}

		Ok(Self { client, http_client, error_mapper })
	}

	fn map_error(
		&self,
		strategy: &dyn ProviderStrategy,
		grant: GrantType,
		meta: Option<ResponseMetadata>,
		err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
	) -> Error {
		let meta = meta.as_ref();

		match err {
			RequestTokenError::ServerResponse(response) =>
				map_server_response(strategy, grant, response, meta),
			RequestTokenError::Request(error) =>
				self.error_mapper.map_transport_error(grant, meta, error),
			RequestTokenError::Parse(source, _body) =>
				TransientError::TokenResponseParse { source, status: meta_status(meta) }.into(),
			RequestTokenError::Other(message) => transient(meta, message),
		}
	}
}
impl<C, M> OAuth2Facade for BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_client_credentials<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		family: TokenFamily,
		scope: &'a ScopeSet,
		extra_params: &'a [(String, String)],
	) -> FacadeFuture<'a, TokenRecord> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let handle = self.http_client.with_metadata(meta.clone());
			let mut request = self.client.exchange_client_credentials();

			for value in scope.iter() {
				request = request.add_scope(Scope::new(value.to_owned()));
			}
			for (key, value) in extra_params {
				request = request.add_extra_param(key, value);
			}

			let response = request.request_async(&handle).await.map_err(|err| {
				self.map_error(strategy, GrantType::ClientCredentials, meta.take(), err)
			})?;

			record_from_response(GrantType::ClientCredentials, family, scope, &response)
		})
	}

	fn refresh_token<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		family: TokenFamily,
		refresh_token: &'a str,
		scope: &'a ScopeSet,
	) -> FacadeFuture<'a, (TokenRecord, Option<String>)> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let handle = self.http_client.with_metadata(meta.clone());
			let secret = RefreshToken::new(refresh_token.to_owned());
			let mut request = self.client.exchange_refresh_token(&secret);

			for value in scope.iter() {
				request = request.add_scope(Scope::new(value.to_owned()));
			}

			let response = request.request_async(&handle).await.map_err(|err| {
				self.map_error(strategy, GrantType::RefreshToken, meta.take(), err)
			})?;
			let record = record_from_response(GrantType::RefreshToken, family, scope, &response)?;
			let rotated = response.refresh_token().map(|token| token.secret().to_owned());

			Ok((record, rotated))
		})
	}

	fn exchange_authorization_code<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		family: TokenFamily,
		code: &'a str,
		pkce_verifier: &'a str,
		scope: &'a ScopeSet,
		redirect_uri: &'a Url,
	) -> FacadeFuture<'a, TokenRecord> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let handle = self.http_client.with_metadata(meta.clone());
			let redirect = RedirectUrl::new(redirect_uri.to_string())
				.map_err(|source| ConfigError::InvalidDescriptor { source })?;
			let mut request = self
				.client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()))
				.set_redirect_uri(Cow::Owned(redirect));

			if !scope.is_empty() {
				request = request.add_extra_param("scope", scope.normalized());
			}

			let response = request.request_async(&handle).await.map_err(|err| {
				self.map_error(strategy, GrantType::AuthorizationCode, meta.take(), err)
			})?;

			record_from_response(GrantType::AuthorizationCode, family, scope, &response)
		})
	}
}

fn record_from_response(
	grant: GrantType,
	family: TokenFamily,
	scope: &ScopeSet,
	response: &BasicTokenResponse,
) -> Result<TokenRecord> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}
	if let Some(returned) = response.scopes() {
		let returned =
			ScopeSet::new(returned.iter().map(|value| value.to_string())).map_err(ConfigError::from)?;

		if returned != *scope {
			return Err(ConfigError::ScopesChanged { grant: grant.as_str() }.into());
		}
	}

	let mut builder = TokenRecord::builder(family, scope.clone())
		.access_token(response.access_token().secret().to_owned())
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(Duration::seconds(expires_in));

	if let Some(refresh) = response.refresh_token() {
		builder = builder.refresh_token(refresh.secret().to_owned());
	}

	builder.build().map_err(|err| ConfigError::from(err).into())
}

fn map_server_response(
	strategy: &dyn ProviderStrategy,
	grant: GrantType,
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let code = response.error().as_ref().to_string();
	let mut ctx = ProviderErrorContext::new(grant).with_oauth_error(code.clone());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = meta_status(meta) {
		ctx = ctx.with_http_status(status);
	}

	let reason = match response.error_description() {
		Some(description) => format!("{code}: {description}"),
		None => code,
	};

	match strategy.classify_token_error(&ctx) {
		ProviderErrorKind::InvalidGrant => Error::InvalidGrant { reason },
		ProviderErrorKind::InvalidClient => Error::InvalidClient { reason },
		ProviderErrorKind::InsufficientScope => Error::InsufficientScope { reason },
		ProviderErrorKind::Transient => transient(meta, reason),
	}
}

fn transient(meta: Option<&ResponseMetadata>, message: String) -> Error {
	TransientError::TokenEndpoint {
		message,
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}

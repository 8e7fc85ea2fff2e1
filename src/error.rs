//! Crate-level error types shared by configuration, flows, stores, and the session.

// std
use std::path::PathBuf;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Preferences file failure.
	#[error(transparent)]
	Preferences(#[from] crate::preferences::PreferencesError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Requested scopes exceed what was granted.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Provider- or crate-supplied reason string.
		reason: String,
	},
	/// Kroger rejected the grant (e.g., bad code or refresh token).
	#[error("Kroger rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or crate-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider- or crate-supplied reason string.
		reason: String,
	},
	/// Token has been revoked and must not be reused.
	#[error("Token has been revoked.")]
	Revoked,
	/// No usable user token exists; the customer must complete the authorization flow.
	#[error(
		"Authentication required. Start the authorization flow and complete it with the redirect URL."
	)]
	AuthenticationRequired,
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// One or more required environment variables are absent or empty.
	#[error("Missing required environment variables: {}.", .names.join(", "))]
	MissingVariables {
		/// Missing keys in declaration order.
		names: Vec<&'static str>,
	},
	/// `KROGER_REDIRECT_URI` is not an absolute URI.
	#[error("Redirect URI `{value}` is invalid.")]
	InvalidRedirectUri {
		/// Rejected value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// `KROGER_USER_ZIP_CODE` is not a US ZIP or ZIP+4 code.
	#[error("Zip code `{value}` must be five digits, optionally followed by a dash and four digits.")]
	InvalidZipCode {
		/// Rejected value.
		value: String,
	},
	/// The dotenv file could not be read or parsed.
	#[error("Environment file {} could not be loaded.", .path.display())]
	EnvFile {
		/// File that failed to load.
		path: PathBuf,
		/// Underlying dotenv failure.
		#[source]
		source: dotenvy::Error,
	},
	/// The `.env` file found in the working directory or one of its parents failed to load.
	#[error("Discovered dotenv file could not be loaded.")]
	Dotenv(#[source] dotenvy::Error),
	/// The dotenv file could not be written.
	#[error("Environment file {} could not be written.", .path.display())]
	EnvFileWrite {
		/// File that failed to persist.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// A value contains characters the dotenv format cannot carry verbatim.
	#[error("Value of `{key}` contains a single quote or line break and cannot be written.")]
	UnrepresentableValue {
		/// Offending key.
		key: &'static str,
	},
	/// No home directory is available to place the default preferences file in.
	#[error("Home directory could not be determined for the preferences file.")]
	MissingHomeDirectory,

	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	InvalidProvider(#[from] crate::provider::ProviderDescriptorError),
	/// Identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Descriptor does not enable the requested grant.
	#[error("Descriptor `{descriptor}` does not enable the {grant} grant.")]
	UnsupportedGrant {
		/// Provider identifier string.
		descriptor: String,
		/// Disabled grant label.
		grant: &'static str,
	},
	/// Cached record is missing a refresh secret.
	#[error("Cached token record is missing a refresh token.")]
	MissingRefreshToken,
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Provider changed scopes during the exchange.
	#[error("Token endpoint changed scopes during the {grant} grant.")]
	ScopesChanged {
		/// Grant label.
		grant: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Kroger returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

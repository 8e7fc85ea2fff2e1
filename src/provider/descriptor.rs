//! Validated provider metadata and its builder.

// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	provider::{GrantType, SupportedGrants},
};

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret` (what Kroger expects).
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// Public clients that prove possession via PKCE only.
	NoneWithPkce,
}

/// Endpoints declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the customer is sent to.
	pub authorization: Url,
	/// Token endpoint used for every grant.
	pub token: Url,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint definitions.
	pub endpoints: ProviderEndpoints,
	/// Enabled grants.
	pub supported_grants: SupportedGrants,
	/// Client authentication mechanism.
	pub client_auth_method: ClientAuthMethod,
	/// Character used to join scopes in the `scope` parameter.
	pub scope_delimiter: char,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Checks whether the descriptor enables a grant.
	pub fn supports(&self, grant: GrantType) -> bool {
		self.supported_grants.supports(grant)
	}

	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		if self.supported_grants.is_empty() {
			return Err(ProviderDescriptorError::NoSupportedGrants);
		}
		if self.scope_delimiter.is_control() {
			return Err(ProviderDescriptorError::InvalidScopeDelimiter {
				delimiter: self.scope_delimiter,
			});
		}

		require_https("authorization", &self.endpoints.authorization)?;
		require_https("token", &self.endpoints.token)
	}
}

/// Errors raised while validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Authorization endpoint was not supplied.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint was not supplied.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// At least one grant must be enabled.
	#[error("Descriptor must enable at least one grant type.")]
	NoSupportedGrants,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Scope delimiter is a control character.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Rejected delimiter.
		delimiter: char,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	id: ProviderId,
	authorization_endpoint: Option<Url>,
	token_endpoint: Option<Url>,
	supported_grants: SupportedGrants,
	client_auth_method: ClientAuthMethod,
	scope_delimiter: char,
}
impl ProviderDescriptorBuilder {
	fn new(id: ProviderId) -> Self {
		Self {
			id,
			authorization_endpoint: None,
			token_endpoint: None,
			supported_grants: SupportedGrants::default(),
			client_auth_method: ClientAuthMethod::default(),
			scope_delimiter: ' ',
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Enables a single grant.
	pub fn support_grant(mut self, grant: GrantType) -> Self {
		self.supported_grants = self.supported_grants.enable(grant);

		self
	}

	/// Enables several grants.
	pub fn support_grants(mut self, grants: impl IntoIterator<Item = GrantType>) -> Self {
		self.supported_grants = grants.into_iter().fold(self.supported_grants, SupportedGrants::enable);

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Overrides the scope delimiter (defaults to a space).
	pub fn scope_delimiter(mut self, delimiter: char) -> Self {
		self.scope_delimiter = delimiter;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let descriptor = ProviderDescriptor {
			id: self.id,
			endpoints: ProviderEndpoints { authorization, token },
			supported_grants: self.supported_grants,
			client_auth_method: self.client_auth_method,
			scope_delimiter: self.scope_delimiter,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

fn require_https(endpoint: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.scheme() == "https" {
		Ok(())
	} else {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint, url: url.to_string() })
	}
}

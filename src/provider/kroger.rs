//! Production descriptor and scope names for the Kroger public API.

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeSet},
	error::ConfigError,
	provider::{ClientAuthMethod, GrantType, ProviderDescriptor},
};

/// Descriptor identifier used for Kroger tokens.
pub const PROVIDER_ID: &str = "kroger";
/// Kroger OAuth 2.0 authorization endpoint.
pub const AUTHORIZE_URL: &str = "https://api.kroger.com/v1/connect/oauth2/authorize";
/// Kroger OAuth 2.0 token endpoint.
pub const TOKEN_URL: &str = "https://api.kroger.com/v1/connect/oauth2/token";

/// Read access to product search and details.
pub const SCOPE_PRODUCT_COMPACT: &str = "product.compact";
/// Write access to the customer's cart.
pub const SCOPE_CART_BASIC_WRITE: &str = "cart.basic:write";
/// Read access to the customer's profile.
pub const SCOPE_PROFILE_COMPACT: &str = "profile.compact";

/// Builds the descriptor for `api.kroger.com` with every grant enabled.
pub fn descriptor() -> Result<ProviderDescriptor> {
	let id = ProviderId::new(PROVIDER_ID).map_err(ConfigError::from)?;
	let authorization =
		Url::parse(AUTHORIZE_URL).map_err(|source| ConfigError::InvalidDescriptor { source })?;
	let token = Url::parse(TOKEN_URL).map_err(|source| ConfigError::InvalidDescriptor { source })?;
	let descriptor = ProviderDescriptor::builder(id)
		.authorization_endpoint(authorization)
		.token_endpoint(token)
		.support_grants(GrantType::ALL)
		.client_auth_method(ClientAuthMethod::ClientSecretBasic)
		.build()
		.map_err(ConfigError::from)?;

	Ok(descriptor)
}

/// Scopes requested for application (client-credentials) tokens.
pub fn application_scope() -> ScopeSet {
	ScopeSet::new([SCOPE_PRODUCT_COMPACT]).unwrap_or_default()
}

/// Scopes requested for customer (authorization-code) tokens.
pub fn user_scope() -> ScopeSet {
	ScopeSet::new([SCOPE_PRODUCT_COMPACT, SCOPE_CART_BASIC_WRITE, SCOPE_PROFILE_COMPACT])
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn descriptor_targets_kroger_endpoints() {
		let descriptor = descriptor().expect("Kroger descriptor should validate.");

		assert_eq!(descriptor.id.as_ref(), "kroger");
		assert_eq!(descriptor.endpoints.token.as_str(), TOKEN_URL);
		assert_eq!(descriptor.endpoints.authorization.as_str(), AUTHORIZE_URL);
		assert_eq!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretBasic);
		assert!(GrantType::ALL.into_iter().all(|grant| descriptor.supports(grant)));
	}

	#[test]
	fn scope_sets_cover_kroger_permissions() {
		assert_eq!(application_scope().normalized(), "product.compact");
		assert_eq!(user_scope().normalized(), "cart.basic:write product.compact profile.compact");
	}
}

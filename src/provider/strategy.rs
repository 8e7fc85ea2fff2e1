//! Strategy hooks that customize token exchanges.
//!
//! Implementations decorate outgoing token requests and classify token endpoint failures
//! without tying flows to a particular HTTP client.

// self
use crate::{_prelude::*, provider::GrantType};

/// Hook that lets a provider decorate requests and classify errors.
///
/// The hooks only see crate-owned data so strategies never depend on reqwest types.
pub trait ProviderStrategy: Send + Sync {
	/// Maps a failed token request into the crate taxonomy.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds provider-specific form parameters before a token request is dispatched.
	fn augment_token_request(&self, _grant: GrantType, _form: &mut BTreeMap<String, String>) {}
}

/// Canonical provider error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// The authorization grant (code or refresh token) was rejected.
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Requested scopes exceed what the client may obtain.
	InsufficientScope,
	/// Failure is temporary and may be retried.
	Transient,
}

/// Primitive view of a failed token request handed to [`ProviderStrategy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Grant type of the failing request.
	pub grant_type: GrantType,
	/// HTTP status code, when available.
	pub http_status: Option<u16>,
	/// OAuth `error` field.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Truncated response body for non-JSON payloads.
	pub body_preview: Option<String>,
	/// Whether the failure came from the network layer.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates an empty context for the provided grant.
	pub fn new(grant_type: GrantType) -> Self {
		Self {
			grant_type,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Context for transport-level failures.
	pub fn network_failure(grant_type: GrantType) -> Self {
		Self { network_error: true, ..Self::new(grant_type) }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description`.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview, truncated to 256 characters.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		let body = body.into();
		let preview = if body.chars().count() > Self::BODY_PREVIEW_LIMIT {
			let mut cut = body.chars().take(Self::BODY_PREVIEW_LIMIT).collect::<String>();

			cut.push('…');

			cut
		} else {
			body
		};

		self.body_preview = Some(preview);

		self
	}
}

/// RFC 6749 guided classification used for Kroger.
///
/// Network failures are transient. Otherwise the OAuth `error` code wins, then the
/// description, then hints in the body, and finally the HTTP status.
#[derive(Debug, Default)]
pub struct StandardStrategy;
impl ProviderStrategy for StandardStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}

		ctx.oauth_error
			.as_deref()
			.and_then(classify_code)
			.or_else(|| ctx.error_description.as_deref().and_then(classify_code))
			.or_else(|| ctx.error_description.as_deref().and_then(classify_text))
			.or_else(|| ctx.body_preview.as_deref().and_then(classify_text))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn classify_code(code: &str) -> Option<ProviderErrorKind> {
	let code = code.to_ascii_lowercase();

	match code.as_str() {
		"invalid_grant" | "access_denied" => Some(ProviderErrorKind::InvalidGrant),
		"invalid_client" | "unauthorized_client" => Some(ProviderErrorKind::InvalidClient),
		"invalid_scope" | "insufficient_scope" => Some(ProviderErrorKind::InsufficientScope),
		"temporarily_unavailable" | "server_error" => Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_text(text: &str) -> Option<ProviderErrorKind> {
	let lowered = text.to_ascii_lowercase();

	if lowered.contains("invalid_grant") {
		Some(ProviderErrorKind::InvalidGrant)
	} else if lowered.contains("invalid_client") {
		Some(ProviderErrorKind::InvalidClient)
	} else if lowered.contains("insufficient_scope") || lowered.contains("invalid_scope") {
		Some(ProviderErrorKind::InsufficientScope)
	} else if lowered.contains("temporarily_unavailable") || lowered.contains("retry") {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn oauth_code_beats_status() {
		let ctx = ProviderErrorContext::new(GrantType::RefreshToken)
			.with_http_status(401)
			.with_oauth_error("invalid_grant");

		assert_eq!(StandardStrategy.classify_token_error(&ctx), ProviderErrorKind::InvalidGrant);
	}

	#[test]
	fn description_and_body_hints_are_used() {
		let ctx = ProviderErrorContext::new(GrantType::AuthorizationCode)
			.with_http_status(500)
			.with_error_description("invalid_grant: code already used");

		assert_eq!(StandardStrategy.classify_token_error(&ctx), ProviderErrorKind::InvalidGrant);

		let ctx = ProviderErrorContext::new(GrantType::ClientCredentials)
			.with_body_preview("error=insufficient_scope");

		assert_eq!(
			StandardStrategy.classify_token_error(&ctx),
			ProviderErrorKind::InsufficientScope
		);
	}

	#[test]
	fn status_and_network_fallbacks() {
		let unauthorized =
			ProviderErrorContext::new(GrantType::ClientCredentials).with_http_status(401);
		let throttled = ProviderErrorContext::new(GrantType::ClientCredentials).with_http_status(429);
		let network = ProviderErrorContext::network_failure(GrantType::RefreshToken);

		assert_eq!(
			StandardStrategy.classify_token_error(&unauthorized),
			ProviderErrorKind::InvalidClient
		);
		assert_eq!(StandardStrategy.classify_token_error(&throttled), ProviderErrorKind::Transient);
		assert_eq!(StandardStrategy.classify_token_error(&network), ProviderErrorKind::Transient);
	}

	#[test]
	fn body_preview_is_truncated() {
		let ctx = ProviderErrorContext::new(GrantType::RefreshToken).with_body_preview("x".repeat(300));
		let preview = ctx.body_preview.expect("Preview should be recorded.");

		assert_eq!(preview.chars().count(), 257);
		assert!(preview.ends_with('…'));
	}
}

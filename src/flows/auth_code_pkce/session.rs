// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::ScopeSet, flows::common, provider::ProviderDescriptor};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 (RFC 7636 `S256`).
	S256,
}
impl PkceCodeChallengeMethod {
	/// RFC 7636 identifier.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// In-flight user authorization returned by
/// [`TokenBroker::start_authorization`](crate::flows::TokenBroker::start_authorization).
///
/// Keep it until the callback arrives; the PKCE verifier inside never leaves the process.
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Requested scopes.
	pub scope: ScopeSet,
	/// Opaque value Kroger must echo back on the callback.
	pub state: String,
	/// Redirect URI sent with the authorize request.
	pub redirect_uri: Url,
	/// URL the customer opens to grant access.
	pub authorize_url: Url,
	pkce: PkcePair,
}
impl AuthorizationSession {
	/// PKCE code challenge sent with the authorize request.
	pub fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	/// PKCE challenge method (always `S256`).
	pub fn code_challenge_method(&self) -> PkceCodeChallengeMethod {
		self.pkce.method
	}

	/// Checks the `state` returned on the callback.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state {
			Ok(())
		} else {
			Err(Error::InvalidGrant { reason: "authorization state mismatch".into() })
		}
	}

	/// Extracts the authorization code from a callback URL after checking `state`.
	///
	/// An OAuth `error` parameter (for example `access_denied`) is reported as
	/// [`Error::InvalidGrant`], as are a missing code and a malformed URL.
	pub fn authorization_code(&self, callback_url: &str) -> Result<String> {
		let url = Url::parse(callback_url)
			.map_err(|e| Error::InvalidGrant { reason: format!("malformed callback URL: {e}") })?;
		let params = url.query_pairs().into_owned().collect::<HashMap<_, _>>();

		if let Some(error) = params.get("error") {
			let reason = match params.get("error_description") {
				Some(description) => format!("{error}: {description}"),
				None => error.to_owned(),
			};

			return Err(Error::InvalidGrant { reason });
		}

		self.validate_state(params.get("state").map(String::as_str).unwrap_or_default())?;

		params.get("code").filter(|code| !code.is_empty()).cloned().ok_or_else(|| {
			Error::InvalidGrant { reason: "callback URL carries no authorization code".into() }
		})
	}

	pub(super) fn into_exchange_parts(self) -> (ScopeSet, Url, PkcePair) {
		(self.scope, self.redirect_uri, self.pkce)
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("scope", &self.scope)
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("code_challenge", &self.pkce.challenge)
			.field("code_challenge_method", &self.pkce.method)
			.finish()
	}
}

#[derive(Clone)]
pub(super) struct PkcePair {
	pub(super) verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

pub(super) fn build_session(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	scope: ScopeSet,
	redirect_uri: Url,
) -> AuthorizationSession {
	let state = random_string(STATE_LEN);
	let pkce = PkcePair::generate();
	let mut authorize_url = descriptor.endpoints.authorization.clone();

	{
		let mut pairs = authorize_url.query_pairs_mut();

		pairs
			.append_pair("response_type", "code")
			.append_pair("client_id", client_id)
			.append_pair("redirect_uri", redirect_uri.as_str());

		if let Some(value) = common::format_scope(&scope, descriptor.scope_delimiter) {
			pairs.append_pair("scope", &value);
		}

		pairs
			.append_pair("state", &state)
			.append_pair("code_challenge", &pkce.challenge)
			.append_pair("code_challenge_method", pkce.method.as_str());
	}

	AuthorizationSession { scope, state, redirect_uri, authorize_url, pkce }
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

//! Authorization code grant with PKCE for customer tokens.
//!
//! [`TokenBroker::start_authorization`] produces the URL the customer opens in a browser.
//! Once Kroger redirects back, hand the callback URL to
//! [`TokenBroker::complete_authorization`] (or the bare code to
//! [`TokenBroker::exchange_code`]) to obtain and store the user token.

mod session;

pub use session::*;

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenKind, TokenRecord},
	flows::TokenBroker,
	http::TokenHttpClient,
	oauth::{OAuth2Facade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::GrantType,
};

impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Starts a user authorization: fresh `state`, S256 PKCE pair, and the authorize URL.
	pub fn start_authorization(
		&self,
		scope: ScopeSet,
		redirect_uri: Url,
	) -> Result<AuthorizationSession> {
		let _span = FlowSpan::new(FlowKind::AuthorizationCode, "start_authorization").entered();

		self.ensure_supported(GrantType::AuthorizationCode)?;

		let session = session::build_session(&self.descriptor, &self.client_id, scope, redirect_uri);

		tracing::debug!(scope = %session.scope, "authorization session started");

		Ok(session)
	}

	/// Exchanges an authorization code and stores the resulting user token.
	pub async fn exchange_code(
		&self,
		session: AuthorizationSession,
		code: impl AsRef<str>,
	) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "exchange_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.ensure_supported(GrantType::AuthorizationCode)?;

				let (scope, redirect_uri, pkce) = session.into_exchange_parts();
				let record = self
					.facade()?
					.exchange_authorization_code(
						self.strategy.as_ref(),
						self.family(TokenKind::User),
						code.as_ref(),
						&pkce.verifier,
						&scope,
						&redirect_uri,
					)
					.await?;

				self.store.save(record.clone()).await?;

				Ok(record)
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	/// Finishes an authorization from the URL Kroger redirected the browser to.
	///
	/// The callback must carry the session's `state` and either a `code` or an OAuth `error`.
	pub async fn complete_authorization(
		&self,
		session: AuthorizationSession,
		callback_url: &str,
	) -> Result<TokenRecord> {
		let code = session.authorization_code(callback_url)?;

		self.exchange_code(session, code).await
	}
}

//! Client credentials grant for application tokens.
//!
//! [`TokenBroker::client_credentials`] serves a stored token while it is outside the
//! preemptive window and otherwise asks the token endpoint for a new one. Callers for the
//! same store key share a singleflight guard, so a burst of requests yields one upstream call.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	flows::{
		TokenBroker,
		common::{self, CachedTokenRequest},
	},
	http::TokenHttpClient,
	oauth::{OAuth2Facade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::GrantType,
	store::StoreKey,
};

impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Performs the `client_credentials` grant, reusing a stored token when possible.
	pub async fn client_credentials(&self, request: CachedTokenRequest) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::ClientCredentials;

		let span = FlowSpan::new(KIND, "client_credentials");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.ensure_supported(GrantType::ClientCredentials)?;

				let family = self.family(request.kind);
				let key = StoreKey::new(&family, &request.scope);
				let guard = common::flow_guard(self, &key);
				let _singleflight = guard.lock().await;
				let now = OffsetDateTime::now_utc();

				if let Some(current) = self
					.store
					.fetch(&family, &request.scope)
					.await?
					.filter(|record| !request.should_refresh(record, now))
				{
					tracing::debug!(kind = %request.kind, "reusing stored token");

					return Ok(current);
				}

				let mut form = BTreeMap::new();

				self.strategy.augment_token_request(GrantType::ClientCredentials, &mut form);

				let extra_params = form
					.into_iter()
					.filter(|(key, _)| key != "grant_type" && key != "scope")
					.collect::<Vec<_>>();
				let record = self
					.facade()?
					.exchange_client_credentials(
						self.strategy.as_ref(),
						family,
						&request.scope,
						&extra_params,
					)
					.await?;

				self.store.save(record.clone()).await?;

				Ok(record)
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}
}

//! Refresh token rotation.
//!
//! [`TokenBroker::refresh_access_token`] takes the singleflight guard for the store key,
//! keeps the stored record when it is still fresh, and otherwise redeems its refresh token.
//! The new record is written with a compare-and-swap on the old refresh token so a rotation
//! that raced ahead of us wins. Kroger rejecting the refresh token revokes the stored record.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{Secret, TokenRecord},
	error::ConfigError,
	flows::{CachedTokenRequest, TokenBroker, common},
	http::TokenHttpClient,
	oauth::{OAuth2Facade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::GrantType,
	store::{CompareAndSwapOutcome, StoreKey},
};

impl<C, M> TokenBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Refreshes the stored token for the request's kind and scope.
	///
	/// Fails with [`Error::InvalidGrant`] when nothing is stored and with
	/// [`ConfigError::MissingRefreshToken`] when the stored record cannot be refreshed.
	pub async fn refresh_access_token(&self, request: CachedTokenRequest) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_access_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span.instrument(self.refresh_locked(request)).await;

		match &result {
			Ok(_) => self.refresh_metrics.record_success(),
			Err(_) => self.refresh_metrics.record_failure(),
		}

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	async fn refresh_locked(&self, request: CachedTokenRequest) -> Result<TokenRecord> {
		self.ensure_supported(GrantType::RefreshToken)?;

		let family = self.family(request.kind);
		let scope = &request.scope;
		let key = StoreKey::new(&family, scope);
		let guard = common::flow_guard(self, &key);
		let _singleflight = guard.lock().await;
		let now = OffsetDateTime::now_utc();
		let current = self.store.fetch(&family, scope).await?.ok_or_else(|| Error::InvalidGrant {
			reason: "no stored token is available to refresh".into(),
		})?;

		if !request.should_refresh(&current, now) {
			return Ok(current);
		}

		let expected = current
			.refresh_token
			.as_ref()
			.map(|secret| secret.expose().to_owned())
			.ok_or(ConfigError::MissingRefreshToken)?;
		let (mut updated, rotated) = match self
			.facade()?
			.refresh_token(self.strategy.as_ref(), family.clone(), &expected, scope)
			.await
		{
			Ok(result) => result,
			Err(err) => {
				if matches!(err, Error::InvalidGrant { .. } | Error::Revoked) {
					tracing::warn!(kind = %request.kind, "refresh token rejected, revoking");

					let _ = self.store.revoke(&family, scope, now).await;
				}

				return Err(err);
			},
		};

		if rotated.is_none() {
			updated.refresh_token = Some(Secret::new(expected.as_str()));
		}

		match self
			.store
			.compare_and_swap_refresh(&family, scope, Some(&expected), updated.clone())
			.await?
		{
			CompareAndSwapOutcome::Updated => Ok(updated),
			CompareAndSwapOutcome::Missing => {
				self.store.save(updated.clone()).await?;

				Ok(updated)
			},
			CompareAndSwapOutcome::RefreshMismatch => match self.store.fetch(&family, scope).await? {
				Some(existing) => Ok(existing),
				None => {
					self.store.save(updated.clone()).await?;

					Ok(updated)
				},
			},
		}
	}
}

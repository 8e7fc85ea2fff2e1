//! Pieces shared by the flows: cached-request policy, scope formatting, singleflight guards.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenKind, TokenRecord},
	flows::TokenBroker,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	store::StoreKey,
};

/// Request for a token that may be served from the store.
#[derive(Clone, Debug)]
pub struct CachedTokenRequest {
	/// Audience of the token.
	pub kind: TokenKind,
	/// Scopes the token must carry.
	pub scope: ScopeSet,
	/// Skip the cache and always contact the token endpoint.
	pub force: bool,
	/// Window before expiry in which a cached token is replaced early.
	pub preemptive_window: Duration,
}
impl CachedTokenRequest {
	const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);

	/// Creates a request for `kind` tokens carrying `scope`.
	pub fn new(kind: TokenKind, scope: ScopeSet) -> Self {
		Self { kind, scope, force: false, preemptive_window: Self::DEFAULT_PREEMPTIVE_WINDOW }
	}

	/// Bypasses the cache.
	pub fn force_refresh(mut self) -> Self {
		self.force = true;

		self
	}

	/// Sets the force flag.
	pub fn with_force(mut self, force: bool) -> Self {
		self.force = force;

		self
	}

	/// Overrides the preemptive window (60 seconds by default); negative values clamp to zero.
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = window.max(Duration::ZERO);

		self
	}

	/// Whether `record` must be replaced at `now`.
	///
	/// The window is shortened by a jitter derived from the request so callers holding
	/// different tokens do not all refresh in the same second.
	pub fn should_refresh(&self, record: &TokenRecord, now: OffsetDateTime) -> bool {
		if self.force || record.is_revoked() || record.is_expired_at(now) {
			return true;
		}

		let window = self.effective_preemptive_window();

		!window.is_zero() && record.expires_at - now <= window
	}

	fn effective_preemptive_window(&self) -> Duration {
		self.preemptive_window.checked_sub(self.preemptive_jitter()).unwrap_or(Duration::ZERO)
	}

	fn preemptive_jitter(&self) -> Duration {
		let window_secs = self.preemptive_window.whole_seconds();

		if window_secs <= 1 {
			return Duration::ZERO;
		}

		// `window_secs` is positive here, so the modulus is non-zero.
		let jitter = self.jitter_seed() % window_secs.unsigned_abs();

		Duration::seconds(i64::try_from(jitter).unwrap_or(0))
	}

	fn jitter_seed(&self) -> u64 {
		let mut hasher = DefaultHasher::new();

		self.kind.hash(&mut hasher);
		self.scope.hash(&mut hasher);

		hasher.finish()
	}
}

/// Joins scopes with the provider delimiter; `None` for an empty set.
pub(crate) fn format_scope(scope: &ScopeSet, delimiter: char) -> Option<String> {
	if scope.is_empty() {
		return None;
	}
	if delimiter == ' ' {
		return Some(scope.normalized());
	}

	let mut buf = String::new();

	for (idx, value) in scope.iter().enumerate() {
		if idx > 0 {
			buf.push(delimiter);
		}

		buf.push_str(value);
	}

	Some(buf)
}

/// Singleflight guard for `key`, created on first use.
pub(crate) fn flow_guard<C, M>(broker: &TokenBroker<C, M>, key: &StoreKey) -> Arc<AsyncMutex<()>>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	broker
		.flow_guards
		.lock()
		.entry(key.clone())
		.or_insert_with(|| Arc::new(AsyncMutex::new(())))
		.clone()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::TokenFamily;

	fn record(now: OffsetDateTime, expires_in: Duration) -> TokenRecord {
		TokenRecord::builder(TokenFamily::new(TokenKind::Application), ScopeSet::default())
			.access_token("token")
			.issued_at(now)
			.expires_in(expires_in)
			.build()
			.expect("Record fixture should build.")
	}

	#[test]
	fn scope_formatting_honors_the_delimiter() {
		let scope = ScopeSet::new(["product.compact", "cart.basic:write"])
			.expect("Scope fixture should be valid.");

		assert_eq!(format_scope(&scope, ' '), Some("cart.basic:write product.compact".into()));
		assert_eq!(format_scope(&scope, ','), Some("cart.basic:write,product.compact".into()));
		assert_eq!(format_scope(&ScopeSet::default(), ' '), None);
	}

	#[test]
	fn refresh_policy_respects_force_expiry_and_window() {
		let now = OffsetDateTime::now_utc();
		let request = CachedTokenRequest::new(TokenKind::Application, ScopeSet::default());

		assert!(!request.should_refresh(&record(now, Duration::hours(1)), now));
		assert!(request.should_refresh(&record(now, Duration::seconds(1)), now));
		assert!(
			request.clone().force_refresh().should_refresh(&record(now, Duration::hours(1)), now)
		);

		let no_window = request.with_preemptive_window(Duration::seconds(-5));

		assert_eq!(no_window.preemptive_window, Duration::ZERO);
		assert!(!no_window.should_refresh(&record(now, Duration::seconds(30)), now));
	}
}

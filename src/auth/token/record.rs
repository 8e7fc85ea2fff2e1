//! Token records, lifecycle status, and the record builder.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, Secret, TokenFamily, TokenKind},
};

/// Lifecycle status of a token record at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// The issued-at instant lies in the future.
	Pending,
	/// Token can be sent to the Kroger API.
	Active,
	/// Token reached its expiry instant.
	Expired,
	/// Token has been revoked locally or by Kroger.
	Revoked,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// No access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// No expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Issued OAuth tokens plus the metadata needed to decide when to replace them.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Audience and provider of the token.
	pub family: TokenFamily,
	/// Normalized scopes granted to this record.
	pub scope: ScopeSet,
	/// Access token; callers must avoid logging it.
	pub access_token: Secret,
	/// Refresh token, if Kroger issued one.
	pub refresh_token: Option<Secret>,
	/// Instant the token was issued.
	pub issued_at: OffsetDateTime,
	/// Instant the token stops being accepted.
	pub expires_at: OffsetDateTime,
	/// Revocation instant if the record has been revoked.
	pub revoked_at: Option<OffsetDateTime>,
}
impl TokenRecord {
	/// Returns a builder for the provided family and scope.
	pub fn builder(family: TokenFamily, scope: ScopeSet) -> TokenRecordBuilder {
		TokenRecordBuilder::new(family, scope)
	}

	/// Audience shortcut for `family.kind`.
	pub fn kind(&self) -> TokenKind {
		self.family.kind
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if self.revoked_at.is_some() {
			return TokenStatus::Revoked;
		}
		if instant < self.issued_at {
			return TokenStatus::Pending;
		}
		if instant >= self.expires_at {
			return TokenStatus::Expired;
		}

		TokenStatus::Active
	}

	/// Status relative to the current UTC clock.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the record is active at the provided instant.
	pub fn is_active_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Returns `true` if the record is active right now.
	pub fn is_active(&self) -> bool {
		self.is_active_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the record has been revoked.
	pub fn is_revoked(&self) -> bool {
		self.revoked_at.is_some()
	}

	/// Marks the record as revoked.
	pub fn revoke(&mut self, instant: OffsetDateTime) {
		self.revoked_at = Some(instant);
	}

	/// Value for the `Authorization` header of Kroger API requests.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("family", &self.family)
			.field("scope", &self.scope)
			.field("access_token", &self.access_token)
			.field("refresh_token", &self.refresh_token)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("revoked_at", &self.revoked_at)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	family: TokenFamily,
	scope: ScopeSet,
	access_token: Option<Secret>,
	refresh_token: Option<Secret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	fn new(family: TokenFamily, scope: ScopeSet) -> Self {
		Self {
			family,
			scope,
			access_token: None,
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Sets the issued-at instant (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant; wins over [`expires_in`](Self::expires_in).
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry measured from the issued-at instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(Secret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(Secret::new(token));

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(TokenRecordBuilderError::MissingExpiry),
		};

		Ok(TokenRecord {
			family: self.family,
			scope: self.scope,
			access_token,
			refresh_token: self.refresh_token,
			issued_at,
			expires_at,
			revoked_at: None,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn scope() -> ScopeSet {
		ScopeSet::new(["cart.basic:write", "profile.compact"])
			.expect("Scope fixture should be valid for token record tests.")
	}

	#[test]
	fn status_walks_through_every_state() {
		let mut record = TokenRecord::builder(TokenFamily::new(TokenKind::User), scope())
			.access_token("access")
			.refresh_token("refresh")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 00:30 UTC))
			.build()
			.expect("Token record builder should succeed.");

		assert_eq!(record.status_at(macros::datetime!(2024-12-31 23:59 UTC)), TokenStatus::Pending);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:10 UTC)), TokenStatus::Active);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:30 UTC)), TokenStatus::Expired);

		record.revoke(macros::datetime!(2025-01-01 00:05 UTC));

		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:10 UTC)), TokenStatus::Revoked);
	}

	#[test]
	fn relative_expiry_uses_issued_at() {
		let record = TokenRecord::builder(TokenFamily::new(TokenKind::Application), scope())
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::seconds(1800))
			.build()
			.expect("Relative expiry should build.");

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 00:30 UTC));
		assert_eq!(record.kind(), TokenKind::Application);
	}

	#[test]
	fn builder_requires_access_token_and_expiry() {
		let missing_token = TokenRecord::builder(TokenFamily::new(TokenKind::User), scope())
			.expires_in(Duration::minutes(5))
			.build()
			.expect_err("Access token must be required.");

		assert_eq!(missing_token, TokenRecordBuilderError::MissingAccessToken);

		let missing_expiry = TokenRecord::builder(TokenFamily::new(TokenKind::User), scope())
			.access_token("access")
			.build()
			.expect_err("Expiry must be required.");

		assert_eq!(missing_expiry, TokenRecordBuilderError::MissingExpiry);
	}

	#[test]
	fn debug_and_bearer_formatting() {
		let record = TokenRecord::builder(TokenFamily::new(TokenKind::Application), scope())
			.access_token("abc123")
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Token record builder should succeed.");

		assert!(record.is_active());
		assert_eq!(record.bearer(), "Bearer abc123");
		assert!(!format!("{record:?}").contains("abc123"));
	}
}

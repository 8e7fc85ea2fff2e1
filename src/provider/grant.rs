//! Grant types and the set of grants a provider descriptor enables.

// self
use crate::_prelude::*;

/// OAuth 2.0 grant types used against the Kroger token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Authorization Code grant for customer tokens.
	AuthorizationCode,
	/// Refresh Token grant for renewing customer tokens.
	RefreshToken,
	/// Client Credentials grant for application tokens.
	ClientCredentials,
}
impl GrantType {
	/// Every grant, in declaration order.
	pub const ALL: [GrantType; 3] =
		[GrantType::AuthorizationCode, GrantType::RefreshToken, GrantType::ClientCredentials];

	/// Returns the RFC 6749 identifier for the grant type.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
			GrantType::ClientCredentials => "client_credentials",
		}
	}

	const fn bit(self) -> u8 {
		match self {
			GrantType::AuthorizationCode => 0b001,
			GrantType::RefreshToken => 0b010,
			GrantType::ClientCredentials => 0b100,
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Set of grants a descriptor enables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<GrantType>", into = "Vec<GrantType>")]
pub struct SupportedGrants(u8);
impl SupportedGrants {
	/// Returns true if the provided grant is enabled.
	pub fn supports(self, grant: GrantType) -> bool {
		self.0 & grant.bit() != 0
	}

	/// Enables a grant.
	pub fn enable(self, grant: GrantType) -> Self {
		Self(self.0 | grant.bit())
	}

	/// Returns true when no grants are enabled.
	pub fn is_empty(self) -> bool {
		self.0 == 0
	}
}
impl FromIterator<GrantType> for SupportedGrants {
	fn from_iter<I: IntoIterator<Item = GrantType>>(iter: I) -> Self {
		iter.into_iter().fold(Self::default(), Self::enable)
	}
}
impl From<Vec<GrantType>> for SupportedGrants {
	fn from(value: Vec<GrantType>) -> Self {
		value.into_iter().collect()
	}
}
impl From<SupportedGrants> for Vec<GrantType> {
	fn from(value: SupportedGrants) -> Self {
		GrantType::ALL.into_iter().filter(|grant| value.supports(*grant)).collect()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn grants_toggle_independently() {
		let grants = SupportedGrants::default().enable(GrantType::ClientCredentials);

		assert!(grants.supports(GrantType::ClientCredentials));
		assert!(!grants.supports(GrantType::RefreshToken));
		assert!(!grants.is_empty());
		assert!(SupportedGrants::default().is_empty());
	}

	#[test]
	fn grants_serialize_as_labels() {
		let grants: SupportedGrants =
			[GrantType::RefreshToken, GrantType::AuthorizationCode].into_iter().collect();
		let json = serde_json::to_string(&grants).expect("Grant set should serialize.");

		assert_eq!(json, "[\"authorization_code\",\"refresh_token\"]");
	}
}

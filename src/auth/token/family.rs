//! Token families: who a token acts for and which provider minted it.

// self
use crate::{_prelude::*, auth::ProviderId};

/// Audience a token acts for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
	/// Client-credentials token for public catalog and location data.
	Application,
	/// Authorization-code token acting on behalf of a Kroger customer.
	User,
}
impl TokenKind {
	/// Returns a stable label suitable for logs and file names.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKind::Application => "application",
			TokenKind::User => "user",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Groups every token minted for the same audience by the same provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenFamily {
	/// Audience of the tokens.
	pub kind: TokenKind,
	/// Provider that minted the tokens, when known.
	pub provider: Option<ProviderId>,
}
impl TokenFamily {
	/// Creates a family for the provided audience with no provider attached.
	pub fn new(kind: TokenKind) -> Self {
		Self { kind, provider: None }
	}

	/// Attaches the minting provider.
	pub fn with_provider(mut self, provider: ProviderId) -> Self {
		self.provider = Some(provider);

		self
	}
}

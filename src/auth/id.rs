//! Strongly typed identifiers for providers and Kroger store locations.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

/// Longest provider identifier accepted.
pub const PROVIDER_ID_MAX_LEN: usize = 64;
/// Longest store location identifier accepted. Kroger issues eight-digit ids today.
pub const LOCATION_ID_MAX_LEN: usize = 16;

macro_rules! def_id {
	($(#[$meta:meta])* $name:ident, $kind:literal, $check:expr) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates and wraps `value`.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				validate($kind, &value, $check)?;

				Ok(Self(value))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// `Provider` or `Location`.
		kind: &'static str,
	},
	/// The identifier holds a character its kind does not allow.
	#[error("{kind} identifier contains {character:?}.")]
	InvalidCharacter {
		/// `Provider` or `Location`.
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The identifier is longer than its kind allows.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// `Provider` or `Location`.
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Per-kind character and length rules.
struct Rules {
	max_len: usize,
	allowed: fn(char) -> bool,
}

const PROVIDER_RULES: Rules = Rules {
	max_len: PROVIDER_ID_MAX_LEN,
	allowed: |c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'),
};
const LOCATION_RULES: Rules =
	Rules { max_len: LOCATION_ID_MAX_LEN, allowed: |c| c.is_ascii_alphanumeric() };

def_id! {
	/// Lowercase slug naming an OAuth provider descriptor, such as `kroger`.
	ProviderId, "Provider", PROVIDER_RULES
}
def_id! {
	/// Kroger store location identifier, such as `01400943`.
	LocationId, "Location", LOCATION_RULES
}

fn validate(kind: &'static str, value: &str, rules: Rules) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if let Some(character) = value.chars().find(|&c| !(rules.allowed)(c)) {
		return Err(IdentifierError::InvalidCharacter { kind, character });
	}
	if value.len() > rules.max_len {
		return Err(IdentifierError::TooLong { kind, max: rules.max_len });
	}

	Ok(())
}

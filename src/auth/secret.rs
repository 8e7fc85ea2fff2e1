//! Redacting wrapper for credentials and token material.

// self
use crate::_prelude::*;

/// Sensitive string (client secret, access or refresh token) that never prints its value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns true when the wrapped value is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<&str> for Secret {
	fn from(value: &str) -> Self {
		Self(value.to_owned())
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatters_redact() {
		let secret = Secret::new("kroger-client-secret");

		assert_eq!(format!("{secret:?}"), "Secret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "kroger-client-secret");
	}

	#[test]
	fn serializes_as_plain_string() {
		let json = serde_json::to_string(&Secret::new("abc")).expect("Secret should serialize.");

		assert_eq!(json, "\"abc\"");
	}
}

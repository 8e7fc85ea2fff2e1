// self
use crate::{_prelude::*, error::ConfigError};

/// US ZIP (`NNNNN`) or ZIP+4 (`NNNNN-NNNN`) code, kept exactly as supplied.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZipCode(String);
impl ZipCode {
	/// Validates and wraps a ZIP code.
	pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
		let value = value.into();

		if is_zip(&value) { Ok(Self(value)) } else { Err(ConfigError::InvalidZipCode { value }) }
	}

	/// Borrows the code.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for ZipCode {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Display for ZipCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for ZipCode {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl TryFrom<String> for ZipCode {
	type Error = ConfigError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<ZipCode> for String {
	fn from(value: ZipCode) -> Self {
		value.0
	}
}

fn is_zip(value: &str) -> bool {
	let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

	match value.split_once('-') {
		None => value.len() == 5 && digits(value),
		Some((zip, plus4)) => zip.len() == 5 && plus4.len() == 4 && digits(zip) && digits(plus4),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn accepts_zip_and_zip_plus_four() {
		assert_eq!(ZipCode::new("90274").expect("Five digits should be valid.").as_str(), "90274");
		assert_eq!(
			"10001-1234".parse::<ZipCode>().expect("ZIP+4 should be valid.").to_string(),
			"10001-1234"
		);
	}

	#[test]
	fn rejects_malformed_codes() {
		for value in ["", "9027", "902745", "9027a", " 90274", "90274-", "90274-12", "90274 1234"] {
			assert!(
				matches!(ZipCode::new(value), Err(ConfigError::InvalidZipCode { .. })),
				"{value:?} should be rejected"
			);
		}
	}

	#[test]
	fn deserialization_validates() {
		assert!(serde_json::from_str::<ZipCode>("\"90274\"").is_ok());
		assert!(serde_json::from_str::<ZipCode>("\"nope\"").is_err());
	}
}

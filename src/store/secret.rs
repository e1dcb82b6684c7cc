//! Redacting wrapper for values held in credential slots.

// self
use crate::_prelude::*;

/// Stored credential value (access token, refresh token, or serialized user profile).
///
/// Formatting never reveals the value, so secrets can flow through `tracing` fields and error
/// messages safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a slot value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw value; never log it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// `Bearer <token>` header value marked sensitive, or `None` if the token is not valid
	/// header text.
	pub(crate) fn bearer_header(&self) -> Option<HeaderValue> {
		let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0)).ok()?;

		value.set_sensitive(true);

		Some(value)
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<String> for TokenSecret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<&str> for TokenSecret {
	fn from(value: &str) -> Self {
		Self(value.to_owned())
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret(<{} bytes redacted>)", self.0.len())
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

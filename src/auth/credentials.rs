//! Login credentials submitted to the token issuance endpoint.

// self
use crate::_prelude::*;

/// Identifier + secret pair used to obtain a token pair.
#[derive(Clone)]
pub struct Credentials {
	/// Account identifier (usually an email address).
	pub identifier: String,
	/// Account secret; never logged.
	pub secret: String,
}
impl Credentials {
	/// Creates a new credential pair.
	pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
		Self { identifier: identifier.into(), secret: secret.into() }
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("identifier", &self.identifier)
			.field("secret", &"<redacted>")
			.finish()
	}
}

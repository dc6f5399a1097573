//! Access/refresh token kinds and the pair issued at login.

pub mod secret;

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Selects which stored token an operation refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
	/// Short-lived credential attached to protected calls.
	Access,
	/// Longer-lived credential exchanged for a new access token.
	Refresh,
}
impl TokenKind {
	/// Returns a stable label suitable for storage keys and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKind::Access => "access",
			TokenKind::Refresh => "refresh",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token pair returned by the token issuance endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Newly issued access token.
	pub access: TokenSecret,
	/// Newly issued refresh token.
	pub refresh: TokenSecret,
}

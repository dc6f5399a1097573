//! Access-token expiry inspection for JWT-shaped tokens.
//!
//! The signature is never verified; the payload is only read to estimate whether the server
//! will still accept the token. A `401` remains the authoritative expiry signal.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, auth::TokenSecret};

#[derive(Deserialize)]
struct ExpiryClaims {
	exp: Option<i64>,
}

/// Reads the `exp` claim (seconds since the Unix epoch) from a JWT payload.
///
/// Returns `Err(())` when the token is not a decodable JWT and `Ok(None)` when the payload has
/// no `exp` claim.
fn expiry_of(token: &str) -> Result<Option<OffsetDateTime>, ()> {
	let payload = token.split('.').nth(1).ok_or(())?;
	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).map_err(|_| ())?;
	let claims: ExpiryClaims = serde_json::from_slice(&bytes).map_err(|_| ())?;

	match claims.exp {
		Some(exp) => OffsetDateTime::from_unix_timestamp(exp).map(Some).map_err(|_| ()),
		None => Ok(None),
	}
}

/// Returns `true` when `token` is absent, undecodable, or expires within `skew` of `now`.
pub fn is_access_token_expired(
	token: Option<&TokenSecret>,
	now: OffsetDateTime,
	skew: Duration,
) -> bool {
	let Some(token) = token else {
		return true;
	};

	match expiry_of(token.expose()) {
		Ok(Some(expires_at)) => expires_at <= now + skew,
		Ok(None) => false,
		Err(()) => true,
	}
}

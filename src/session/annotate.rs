//! Request annotation: attaches the stored access token to outbound calls.

// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenSecret},
	config::SessionConfig,
	http::ApiRequest,
	store::CredentialStore,
};

/// Attaches the stored access token as a bearer credential unless `request` targets the
/// authentication endpoint group.
///
/// Returns the token that was attached so the caller can tell later whether a `401` was earned
/// with the token that is still stored.
pub fn annotate(
	request: &mut ApiRequest,
	config: &SessionConfig,
	store: &CredentialStore,
) -> Result<Option<TokenSecret>> {
	if config.is_auth_path(&request.path) {
		return Ok(None);
	}

	let Some(token) = store.get(TokenKind::Access)? else {
		return Ok(None);
	};

	request.set_bearer(&token)?;

	Ok(Some(token))
}

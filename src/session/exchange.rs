//! Typed calls to the authentication endpoints (token issuance and token refresh).
//!
//! Both exchanges go straight to the transport: they are never annotated and never routed
//! through the response guard, so their failures reach the caller verbatim.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenPair, TokenSecret},
	config::SessionConfig,
	http::{ApiRequest, HttpTransport},
};

/// Body returned by the refresh endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RefreshGrant {
	/// Newly issued access token.
	pub access: TokenSecret,
	/// Rotated refresh token, when the server rotates on every exchange.
	#[serde(default)]
	pub refresh: Option<TokenSecret>,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
	refresh: &'a str,
}

/// Client for the authentication endpoint group.
pub struct TokenExchange<T>
where
	T: ?Sized + HttpTransport,
{
	config: Arc<SessionConfig>,
	transport: Arc<T>,
}
impl<T> TokenExchange<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an exchange client over the shared transport.
	pub fn new(config: Arc<SessionConfig>, transport: Arc<T>) -> Self {
		Self { config, transport }
	}

	/// Trades user credentials for a token pair.
	pub async fn obtain(&self, credentials: &Credentials) -> Result<TokenPair> {
		let mut body = Map::new();

		body.insert(
			self.config.identifier_field.clone(),
			Value::String(credentials.identifier.clone()),
		);
		body.insert(self.config.secret_field.clone(), Value::String(credentials.secret.clone()));

		self.post(&self.config.token_path, &body).await
	}

	/// Trades a refresh token for a new access token.
	pub async fn refresh(&self, refresh: &TokenSecret) -> Result<RefreshGrant> {
		self.post(&self.config.refresh_path, &RefreshBody { refresh: refresh.expose() }).await
	}

	async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize + Sync,
		R: DeserializeOwned,
	{
		let request = ApiRequest::post(path).json(body)?.resolve(&self.config)?;
		let response = self.transport.send(request).await?.error_for_status(path)?;

		Ok(response.json(path)?)
	}
}
impl<T> Debug for TokenExchange<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchange")
			.field("token_path", &self.config.token_path)
			.field("refresh_path", &self.config.refresh_path)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_grant_accepts_rotated_and_plain_bodies() {
		let plain: RefreshGrant =
			serde_json::from_str("{\"access\":\"a2\"}").expect("Plain grant should decode.");

		assert_eq!(plain.access, TokenSecret::new("a2"));
		assert_eq!(plain.refresh, None);

		let rotated: RefreshGrant = serde_json::from_str("{\"access\":\"a3\",\"refresh\":\"r3\"}")
			.expect("Rotated grant should decode.");

		assert_eq!(rotated.refresh, Some(TokenSecret::new("r3")));
	}
}

//! Transport primitives for the authenticated request pipeline.
//!
//! [`ApiRequest`] is the caller-facing description of a call: a method, a path relative to the
//! configured base URL, headers, and an optional body. The session resolves it into an
//! [`HttpRequest`] and hands that to an [`HttpTransport`]. Transports report every HTTP status
//! as an [`HttpResponse`]; only failures without a response (DNS, TCP, TLS) come back as
//! [`TransportError`], which is how the pipeline distinguishes network failure from an
//! authoritative `4xx`/`5xx`.

pub use ::http::{HeaderMap, HeaderValue, Method, StatusCode, header};

// crates.io
use ::http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::SessionConfig,
	error::{ApiError, ConfigError, DecodeError, TransportError},
};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP clients capable of executing resolved requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// in-flight call of a session, and the futures they return must be `Send` so replays can hop
/// executors.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches `request` and returns the response, whatever its status.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Caller-facing call description with a path relative to the session base URL.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the base URL (query string allowed).
	pub path: String,
	/// Extra headers sent with the call.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `body` as JSON and sets the content type.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body)?);
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Returns `true` if the call already carries an `Authorization` header.
	pub fn is_authorized(&self) -> bool {
		self.headers.contains_key(AUTHORIZATION)
	}

	/// Sets `token` as the bearer credential, replacing any previous one.
	pub fn set_bearer(&mut self, token: &TokenSecret) -> Result<(), ConfigError> {
		let mut value = HeaderValue::from_str(&token.bearer())?;

		value.set_sensitive(true);
		self.headers.insert(AUTHORIZATION, value);

		Ok(())
	}

	/// Resolves the path against the configured base URL.
	pub fn resolve(&self, config: &SessionConfig) -> Result<HttpRequest, ConfigError> {
		Ok(HttpRequest {
			method: self.method.clone(),
			url: config.resolve(&self.path)?,
			headers: self.headers.clone(),
			body: self.body.clone(),
		})
	}
}

/// Fully resolved request handed to an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Request headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}

/// Response returned by an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response with the provided status and body.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Returns `true` for `2xx` statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns `true` for `401 Unauthorized`.
	pub fn is_unauthorized(&self) -> bool {
		self.status == StatusCode::UNAUTHORIZED
	}

	/// Returns the body lossily decoded as UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self, path: &str) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| DecodeError {
			status: self.status.as_u16(),
			path: path.to_owned(),
			source,
		})
	}

	/// Converts a non-2xx response into an [`ApiError`] for `path`.
	pub fn error_for_status(self, path: &str) -> Result<Self, ApiError> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(self.into_api_error(path))
		}
	}

	/// Converts the response into an [`ApiError`] regardless of its status.
	pub fn into_api_error(self, path: &str) -> ApiError {
		ApiError { status: self.status.as_u16(), path: path.to_owned(), body: self.text() }
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a transport whose calls fail with [`TransportError`] after `timeout`.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let HttpRequest { method, url, headers, body } = request;
			let mut builder = self.0.request(method, url.clone()).headers(headers);

			if let Some(body) = body {
				builder = builder.body(body);
			}

			let response =
				builder.send().await.map_err(|e| TransportError::network(&url, e))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body =
				response.bytes().await.map_err(|e| TransportError::network(&url, e))?.to_vec();

			Ok(HttpResponse { status, headers, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn set_bearer_replaces_previous_credential() {
		let mut request = ApiRequest::get("accounts/");

		request.set_bearer(&TokenSecret::new("old")).expect("Header should be valid.");
		request.set_bearer(&TokenSecret::new("new")).expect("Header should be valid.");

		assert_eq!(
			request.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
			Some("Bearer new")
		);
		assert!(request.headers.get(AUTHORIZATION).is_some_and(HeaderValue::is_sensitive));
	}

	#[test]
	fn json_body_sets_content_type() {
		let request = ApiRequest::post("accounts/")
			.json(&serde_json::json!({ "name": "Savings" }))
			.expect("Body should serialize.");

		assert_eq!(request.body.as_deref(), Some(&b"{\"name\":\"Savings\"}"[..]));
		assert_eq!(
			request.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
			Some("application/json")
		);
	}

	#[test]
	fn error_for_status_preserves_body() {
		let err = HttpResponse::new(StatusCode::BAD_REQUEST, "{\"detail\":\"nope\"}")
			.error_for_status("token/")
			.expect_err("Non-2xx responses should convert into errors.");

		assert_eq!(err.status, 400);
		assert_eq!(err.path, "token/");
		assert_eq!(err.body, "{\"detail\":\"nope\"}");
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn timeout_transport_builds() {
		let transport = ReqwestTransport::with_timeout(std::time::Duration::from_secs(10))
			.expect("A plain client with a timeout should build.");

		let _ = transport.as_ref();
	}

	#[test]
	fn json_decode_reports_failing_field() {
		#[derive(Debug, Deserialize)]
		struct Access {
			#[allow(dead_code)]
			access: String,
		}

		let err = HttpResponse::new(StatusCode::OK, "{\"access\":42}")
			.json::<Access>("token/refresh/")
			.expect_err("Mismatched payload should fail to decode.");

		assert_eq!(err.source.path().to_string(), "access");
	}
}

//! Session-level error types shared across the request pipeline, stores, and transports.

// self
use crate::_prelude::*;

/// Session-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); no response was received.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Authoritative non-2xx response, preserved verbatim.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Authentication endpoint answered with a body that does not match its contract.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// No stored session exists for an operation that needs one.
	#[error("No authenticated session is available.")]
	NotAuthenticated,
}
impl Error {
	/// Returns the HTTP status when the error carries an authoritative response.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(e) => Some(e.status),
			Self::Decode(e) => Some(e.status),
			_ => None,
		}
	}

	/// Returns `true` for `401 Unauthorized` responses.
	pub fn is_unauthorized(&self) -> bool {
		self.status() == Some(401)
	}
}

/// Non-2xx response surfaced to the caller with its status and body untouched.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Request to `{path}` failed with HTTP {status}.")]
pub struct ApiError {
	/// HTTP status code returned by the server.
	pub status: u16,
	/// Request path that produced the response.
	pub path: String,
	/// Raw response body, lossily decoded as UTF-8.
	pub body: String,
}

/// Malformed JSON returned by an authentication or identity endpoint.
#[derive(Debug, ThisError)]
#[error("Response from `{path}` is not valid JSON for the expected shape.")]
pub struct DecodeError {
	/// HTTP status code of the response that failed to decode.
	pub status: u16,
	/// Request path that produced the response.
	pub path: String,
	/// Structured parsing failure.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` does not resolve inside the base URL.")]
	InvalidPath {
		/// Offending request path.
		path: String,
		/// Underlying parsing failure; absent when the path parsed but escaped the base URL.
		#[source]
		source: Option<url::ParseError>,
	},
	/// Header name or value is not valid HTTP.
	#[error("Request header is invalid.")]
	InvalidHeader {
		/// Underlying header failure.
		#[source]
		source: ::http::Error,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Body(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<::http::Error> for ConfigError {
	fn from(e: ::http::Error) -> Self {
		Self::InvalidHeader { source: e }
	}
}
impl From<::http::header::InvalidHeaderValue> for ConfigError {
	fn from(e: ::http::header::InvalidHeaderValue) -> Self {
		Self::InvalidHeader { source: e.into() }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures; no response was received.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{url}`.")]
	Network {
		/// Target URL of the failed request.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: &Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.to_string(), source: Box::new(src) }
	}
}

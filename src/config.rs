//! Session configuration: API base URL, authentication endpoint layout, and redirect target.

// self
use crate::{_prelude::*, error::ConfigError};

/// Errors raised while constructing or validating a [`SessionConfig`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SessionConfigError {
	/// Base URL must be an absolute http(s) URL.
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Relative paths are joined onto the base URL, which therefore must end with `/`.
	#[error("The base URL must end with `/`: {url}.")]
	BaseWithoutTrailingSlash {
		/// Base URL that failed validation.
		url: String,
	},
	/// Auth segment must be a single non-empty path segment.
	#[error("Authentication segment `{segment}` must be a single non-empty path segment.")]
	InvalidAuthSegment {
		/// Segment that failed validation.
		segment: String,
	},
	/// Token endpoints must sit inside the authentication group.
	#[error("The {endpoint} path `{path}` does not contain the `{segment}` segment.")]
	EndpointOutsideAuthGroup {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed validation.
		path: String,
		/// Authentication segment the path should contain.
		segment: String,
	},
	/// Login entry point must be an absolute in-app path.
	#[error("Login path `{path}` must start with `/`.")]
	InvalidLoginPath {
		/// Path that failed validation.
		path: String,
	},
}

/// Validated session configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
	/// Base URL every request path is joined onto.
	pub base_url: Url,
	/// Path segment that marks the authentication endpoint group.
	pub auth_segment: String,
	/// Token issuance endpoint, relative to the base URL.
	pub token_path: String,
	/// Token refresh endpoint, relative to the base URL.
	pub refresh_path: String,
	/// Identity endpoint used after login and on restore.
	pub identity_path: String,
	/// Login entry point used by the session terminator.
	pub login_path: String,
	/// Query parameter carrying the return-to location.
	pub return_param: String,
	/// JSON field carrying the credential identifier at login.
	pub identifier_field: String,
	/// JSON field carrying the credential secret at login.
	pub secret_field: String,
	/// Clock skew applied when inspecting access-token expiry.
	pub expiry_skew: Duration,
}
impl SessionConfig {
	/// Returns a builder seeded with the provided base URL and default endpoint layout.
	pub fn builder(base_url: Url) -> SessionConfigBuilder {
		SessionConfigBuilder::new(base_url)
	}

	/// Returns `true` if `path` belongs to the authentication endpoint group.
	///
	/// Matching is by exact path segment, so `tokens/` or `?q=token` do not qualify.
	pub fn is_auth_path(&self, path: &str) -> bool {
		let path = path.split(['?', '#']).next().unwrap_or_default();

		path.split('/').any(|segment| segment == self.auth_segment)
	}

	/// Resolves a request path against the base URL.
	///
	/// Absolute URLs and paths that climb out of the base path are rejected so the stored
	/// credentials never leave the configured API.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		let invalid = |source| ConfigError::InvalidPath { path: path.to_owned(), source };
		let url = self.base_url.join(path.trim_start_matches('/')).map_err(|e| invalid(Some(e)))?;

		if url.origin() != self.base_url.origin() || !url.path().starts_with(self.base_url.path())
		{
			return Err(invalid(None));
		}

		Ok(url)
	}

	/// Builds the login redirect target, carrying `return_to` when present.
	///
	/// A `return_to` that is already the login page is kept as is, so its own return target
	/// survives repeated teardowns.
	pub fn login_redirect(&self, return_to: Option<&str>) -> String {
		match return_to.filter(|location| !location.is_empty()) {
			Some(location) if self.is_login_location(location) => location.to_owned(),
			Some(location) => {
				let encoded: String = url::form_urlencoded::byte_serialize(location.as_bytes())
					.collect();

				format!("{}?{}={encoded}", self.login_path, self.return_param)
			},
			None => self.login_path.clone(),
		}
	}

	fn is_login_location(&self, location: &str) -> bool {
		location.split(['?', '#']).next() == Some(self.login_path.as_str())
	}

	fn validate(&self) -> Result<(), SessionConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(SessionConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if !self.base_url.path().ends_with('/') {
			return Err(SessionConfigError::BaseWithoutTrailingSlash {
				url: self.base_url.to_string(),
			});
		}
		if self.auth_segment.is_empty() || self.auth_segment.contains('/') {
			return Err(SessionConfigError::InvalidAuthSegment {
				segment: self.auth_segment.clone(),
			});
		}

		self.validate_auth_endpoint("token", &self.token_path)?;
		self.validate_auth_endpoint("refresh", &self.refresh_path)?;

		if !self.login_path.starts_with('/') {
			return Err(SessionConfigError::InvalidLoginPath { path: self.login_path.clone() });
		}

		Ok(())
	}

	fn validate_auth_endpoint(
		&self,
		endpoint: &'static str,
		path: &str,
	) -> Result<(), SessionConfigError> {
		if self.is_auth_path(path) {
			Ok(())
		} else {
			Err(SessionConfigError::EndpointOutsideAuthGroup {
				endpoint,
				path: path.to_owned(),
				segment: self.auth_segment.clone(),
			})
		}
	}
}

/// Builder for [`SessionConfig`] values.
#[derive(Debug)]
pub struct SessionConfigBuilder {
	config: SessionConfig,
}
impl SessionConfigBuilder {
	const DEFAULT_EXPIRY_SKEW: Duration = Duration::seconds(5);

	/// Creates a new builder with the default endpoint layout.
	pub fn new(base_url: Url) -> Self {
		Self {
			config: SessionConfig {
				base_url,
				auth_segment: "token".into(),
				token_path: "token/".into(),
				refresh_path: "token/refresh/".into(),
				identity_path: "users/me/".into(),
				login_path: "/login".into(),
				return_param: "next".into(),
				identifier_field: "email".into(),
				secret_field: "password".into(),
				expiry_skew: Self::DEFAULT_EXPIRY_SKEW,
			},
		}
	}

	/// Overrides the authentication group segment.
	pub fn auth_segment(mut self, segment: impl Into<String>) -> Self {
		self.config.auth_segment = segment.into();

		self
	}

	/// Overrides the token issuance path.
	pub fn token_path(mut self, path: impl Into<String>) -> Self {
		self.config.token_path = path.into();

		self
	}

	/// Overrides the token refresh path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.config.refresh_path = path.into();

		self
	}

	/// Overrides the identity endpoint path.
	pub fn identity_path(mut self, path: impl Into<String>) -> Self {
		self.config.identity_path = path.into();

		self
	}

	/// Overrides the login entry point.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.config.login_path = path.into();

		self
	}

	/// Overrides the return-to query parameter name.
	pub fn return_param(mut self, name: impl Into<String>) -> Self {
		self.config.return_param = name.into();

		self
	}

	/// Overrides the JSON field names used in the login body.
	pub fn credential_fields(
		mut self,
		identifier: impl Into<String>,
		secret: impl Into<String>,
	) -> Self {
		self.config.identifier_field = identifier.into();
		self.config.secret_field = secret.into();

		self
	}

	/// Overrides the expiry skew (negative values clamp to zero).
	pub fn expiry_skew(mut self, skew: Duration) -> Self {
		self.config.expiry_skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<SessionConfig, SessionConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> Url {
		Url::parse("https://api.example.com/api/").expect("Fixture base URL should parse.")
	}

	#[test]
	fn auth_paths_match_whole_segments() {
		let config = SessionConfig::builder(base()).build().expect("Defaults should be valid.");

		assert!(config.is_auth_path("token/"));
		assert!(config.is_auth_path("/token/refresh/"));
		assert!(!config.is_auth_path("tokens/"));
		assert!(!config.is_auth_path("accounts/?filter=token"));
		assert!(!config.is_auth_path("users/me/"));
	}

	#[test]
	fn resolve_joins_relative_and_rooted_paths() {
		let config = SessionConfig::builder(base()).build().expect("Defaults should be valid.");

		assert_eq!(
			config.resolve("users/me/").expect("Path should resolve.").as_str(),
			"https://api.example.com/api/users/me/"
		);
		assert_eq!(
			config.resolve("/token/").expect("Path should resolve.").as_str(),
			"https://api.example.com/api/token/"
		);
	}

	#[test]
	fn resolve_keeps_requests_on_the_api() {
		let config = SessionConfig::builder(base()).build().expect("Defaults should be valid.");

		for path in [
			"https://evil.example.net/collect",
			"http://api.example.com/api/accounts/",
			"../admin/",
			"accounts/../../admin/",
		] {
			let err = config.resolve(path).expect_err("Foreign targets should be rejected.");

			assert!(
				matches!(&err, ConfigError::InvalidPath { path: rejected, .. } if rejected == path),
				"{path} resolved to {err:?}"
			);
		}

		assert!(config.resolve("accounts/?next=https://evil.example.net/").is_ok());
	}

	#[test]
	fn login_redirect_encodes_return_location() {
		let config = SessionConfig::builder(base()).build().expect("Defaults should be valid.");

		assert_eq!(config.login_redirect(None), "/login");
		assert_eq!(config.login_redirect(Some("")), "/login");
		assert_eq!(
			config.login_redirect(Some("/accounts/7?tab=history")),
			"/login?next=%2Faccounts%2F7%3Ftab%3Dhistory"
		);
		assert_eq!(
			config.login_redirect(Some("/login?next=%2Faccounts")),
			"/login?next=%2Faccounts"
		);
		assert_eq!(config.login_redirect(Some("/login")), "/login");
		assert_eq!(config.login_redirect(Some("/login-help")), "/login?next=%2Flogin-help");
	}

	#[test]
	fn builder_rejects_inconsistent_layouts() {
		let err = SessionConfig::builder(base())
			.refresh_path("auth/refresh/")
			.build()
			.expect_err("Refresh path outside the auth group should be rejected.");

		assert!(matches!(
			err,
			SessionConfigError::EndpointOutsideAuthGroup { endpoint: "refresh", .. }
		));

		let err = SessionConfig::builder(
			Url::parse("https://api.example.com/api").expect("Fixture URL should parse."),
		)
		.build()
		.expect_err("Base URL without trailing slash should be rejected.");

		assert!(matches!(err, SessionConfigError::BaseWithoutTrailingSlash { .. }));

		let err = SessionConfig::builder(base())
			.auth_segment("a/b")
			.build()
			.expect_err("Multi-segment auth group should be rejected.");

		assert!(matches!(err, SessionConfigError::InvalidAuthSegment { .. }));

		let err = SessionConfig::builder(base())
			.login_path("login")
			.build()
			.expect_err("Relative login path should be rejected.");

		assert!(matches!(err, SessionConfigError::InvalidLoginPath { .. }));
	}
}

//! Session lifecycle: login, logout, restore, and the cached identity.

// self
use crate::{
	_prelude::*,
	auth::{Credentials, Identity, TokenKind, claims},
	http::HttpTransport,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::Session,
};

impl<T> Session<T>
where
	T: ?Sized + HttpTransport,
{
	/// Exchanges `credentials` for a token pair, then fetches and caches the identity.
	///
	/// Any in-flight refresh from a previous session is discarded first. Concurrent logins on
	/// the same session run one after another.
	pub async fn login(&self, credentials: &Credentials) -> Result<Identity> {
		const KIND: FlowKind = FlowKind::Login;

		let _serialized = self.login_guard.lock().await;
		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.coordinator.reset();

		let result = span
			.instrument(async {
				let pair = self.coordinator.exchange().obtain(credentials).await?;

				self.store.set_access_and_refresh(&pair.access, &pair.refresh)?;

				self.fetch_identity().await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Clears every stored credential and abandons any in-flight refresh.
	///
	/// No navigation happens; redirecting after an explicit logout is up to the caller.
	pub fn logout(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::Logout;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = self.store.clear_all().map_err(Error::from);

		self.coordinator.reset();
		obs::record_result(KIND, &result);

		result
	}

	/// Re-validates persisted credentials by fetching the identity.
	///
	/// Returns `Ok(None)` when no access token is stored or when the server no longer accepts
	/// the session, in which case the stored credentials are cleared. Storage failures are
	/// returned as errors.
	pub async fn restore(&self) -> Result<Option<Identity>> {
		const KIND: FlowKind = FlowKind::Restore;

		if self.store.get(TokenKind::Access)?.is_none() {
			return Ok(None);
		}

		let span = FlowSpan::new(KIND, "restore");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.fetch_identity()).await;

		obs::record_result(KIND, &result);

		match result {
			Ok(identity) => Ok(Some(identity)),
			Err(e @ Error::Storage(_)) => Err(e),
			Err(_) => {
				self.store.clear_all()?;
				self.coordinator.reset();

				Ok(None)
			},
		}
	}

	/// Returns the identity cached by the last login or restore.
	pub fn cached_identity(&self) -> Result<Option<Identity>> {
		Ok(self.store.get_identity()?)
	}

	/// Returns `true` if the stored access token is missing or expires within the configured
	/// skew.
	///
	/// Informational only; refreshes are still driven by `401` responses.
	pub fn access_token_expired(&self) -> Result<bool> {
		let access = self.store.get(TokenKind::Access)?;

		Ok(claims::is_access_token_expired(
			access.as_ref(),
			OffsetDateTime::now_utc(),
			self.config.expiry_skew,
		))
	}

	async fn fetch_identity(&self) -> Result<Identity> {
		let identity: Identity = self.get_json(&self.config.identity_path).await?;

		self.store.set_identity(&identity)?;

		Ok(identity)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::TokenSecret,
		config::SessionConfig,
		http::{HttpRequest, HttpResponse, HttpTransport, StatusCode, TransportFuture},
		session::{MemoryNavigator, Navigator},
		store::CredentialStore,
	};

	/// Serves fixed responses for the token and identity endpoints.
	struct Fixed {
		token: HttpResponse,
		identity: HttpResponse,
		identity_calls: AtomicUsize,
	}
	impl HttpTransport for Fixed {
		fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
			let response = if request.url.path().ends_with("/users/me/") {
				self.identity_calls.fetch_add(1, Ordering::SeqCst);

				self.identity.clone()
			} else {
				self.token.clone()
			};

			Box::pin(async move { Ok(response) })
		}
	}

	/// Token endpoint that answers slowly and records overlapping calls.
	#[derive(Default)]
	struct SlowIssuer {
		in_flight: AtomicUsize,
		peak: AtomicUsize,
		issued: AtomicUsize,
	}
	impl HttpTransport for SlowIssuer {
		fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
			let issuing = !request.url.path().ends_with("/users/me/");

			Box::pin(async move {
				if !issuing {
					return Ok(ok("{\"id\":7}"));
				}

				let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

				self.peak.fetch_max(now, Ordering::SeqCst);
				tokio::time::sleep(std::time::Duration::from_millis(20)).await;
				self.in_flight.fetch_sub(1, Ordering::SeqCst);

				let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

				Ok(ok(&format!("{{\"access\":\"a{n}\",\"refresh\":\"r{n}\"}}")))
			})
		}
	}

	fn session_over<T>(transport: T) -> Session<T>
	where
		T: HttpTransport,
	{
		let config = SessionConfig::builder(
			Url::parse("https://api.example.com/api/").expect("Fixture base URL should parse."),
		)
		.build()
		.expect("Defaults should be valid.");

		Session::with_transport(
			config,
			CredentialStore::in_memory(),
			transport,
			Arc::new(MemoryNavigator::default()) as Arc<dyn Navigator>,
		)
	}

	fn session(token: HttpResponse, identity: HttpResponse) -> Session<Fixed> {
		session_over(Fixed { token, identity, identity_calls: AtomicUsize::new(0) })
	}

	fn ok(body: &str) -> HttpResponse {
		HttpResponse::new(StatusCode::OK, body.to_owned())
	}

	#[tokio::test]
	async fn login_persists_tokens_and_identity() {
		let session = session(
			ok("{\"access\":\"a1\",\"refresh\":\"r1\"}"),
			ok("{\"id\":7,\"email\":\"ada@example.com\"}"),
		);
		let identity = session
			.login(&Credentials::new("ada@example.com", "hunter2"))
			.await
			.expect("Login should succeed.");

		assert_eq!(identity.get_str("email"), Some("ada@example.com"));
		assert_eq!(
			session.store.get(TokenKind::Refresh).expect("Read should succeed."),
			Some(TokenSecret::new("r1"))
		);
		assert_eq!(session.cached_identity().expect("Read should succeed."), Some(identity));
	}

	#[tokio::test]
	async fn concurrent_logins_run_one_after_another() {
		let session = session_over(SlowIssuer::default());
		let first = Credentials::new("ada@example.com", "hunter2");
		let second = Credentials::new("grace@example.com", "cobol");
		let (first, second) = tokio::join!(session.login(&first), session.login(&second));

		first.expect("First login should succeed.");
		second.expect("Second login should succeed.");

		assert_eq!(session.transport.issued.load(Ordering::SeqCst), 2);
		assert_eq!(session.transport.peak.load(Ordering::SeqCst), 1);
		assert_eq!(
			session.store.get(TokenKind::Refresh).expect("Read should succeed."),
			Some(TokenSecret::new("r2"))
		);
	}

	#[tokio::test]
	async fn login_rejection_is_surfaced_without_refresh() {
		let session = session(
			HttpResponse::new(StatusCode::UNAUTHORIZED, "{\"detail\":\"bad credentials\"}"),
			ok("{}"),
		);
		let err = session
			.login(&Credentials::new("ada@example.com", "wrong"))
			.await
			.expect_err("Bad credentials should be rejected.");

		assert_eq!(err.status(), Some(401));
		assert_eq!(session.coordinator.metrics().attempts(), 0);
		assert_eq!(session.transport.identity_calls.load(Ordering::SeqCst), 0);
		assert_eq!(session.store.get(TokenKind::Access).expect("Read should succeed."), None);
	}

	#[tokio::test]
	async fn restore_without_tokens_is_a_no_op() {
		let session = session(ok("{}"), ok("{}"));

		assert_eq!(session.restore().await.expect("Restore should succeed."), None);
		assert_eq!(session.transport.identity_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn restore_clears_a_rejected_session() {
		let session = session(
			HttpResponse::new(StatusCode::BAD_REQUEST, "{}"),
			HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "{}"),
		);

		session
			.store
			.set_access_and_refresh(&TokenSecret::new("a1"), &TokenSecret::new("r1"))
			.expect("Token pair should persist.");

		assert_eq!(session.restore().await.expect("Restore should succeed."), None);
		assert_eq!(session.store.get(TokenKind::Refresh).expect("Read should succeed."), None);
	}

	#[test]
	fn logout_clears_everything() {
		let session = session(ok("{}"), ok("{}"));

		session
			.store
			.set_access_and_refresh(&TokenSecret::new("a1"), &TokenSecret::new("r1"))
			.expect("Token pair should persist.");
		session.logout().expect("Logout should succeed.");

		assert_eq!(session.store.get(TokenKind::Access).expect("Read should succeed."), None);
		assert!(session.access_token_expired().expect("Read should succeed."));
		assert!(!session.coordinator.is_refreshing());
	}
}

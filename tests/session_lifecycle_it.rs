#![cfg(feature = "reqwest")]

// std
use std::{env, fs, process};
// crates.io
use httpmock::prelude::*;
// self
use bearer_session::{
	_preludet::*,
	auth::{Credentials, TokenKind, TokenSecret},
	http::ReqwestTransport,
	session::{MemoryNavigator, Navigator},
	store::{CredentialStore, FileBackend, SessionBackend},
};

const TOKEN: &str = "/api/token/";
const IDENTITY: &str = "/api/users/me/";

#[tokio::test]
async fn login_posts_credentials_and_caches_identity() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let harness = build_reqwest_test_session(&server.base_url());
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN)
				.header_missing("authorization")
				.json_body(serde_json::json!({
					"email": "ada@example.com",
					"password": "hunter2",
				}));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"access-1\",\"refresh\":\"refresh-1\"}");
		})
		.await;
	let identity = server
		.mock_async(|when, then| {
			when.method(GET).path(IDENTITY).header("authorization", "Bearer access-1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":7,\"email\":\"ada@example.com\",\"is_staff\":false}");
		})
		.await;
	let user = harness.session.login(&Credentials::new("ada@example.com", "hunter2")).await?;

	token.assert_calls_async(1).await;
	identity.assert_calls_async(1).await;

	assert_eq!(user.get_str("email"), Some("ada@example.com"));
	assert_eq!(harness.session.cached_identity()?, Some(user));
	assert_eq!(
		harness.session.store.get(TokenKind::Refresh)?,
		Some(TokenSecret::new("refresh-1"))
	);

	Ok(())
}

#[tokio::test]
async fn login_rejection_is_not_refreshed() {
	let server = MockServer::start_async().await;
	let harness = build_reqwest_test_session(&server.base_url());
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN);
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"detail\":\"No active account found with the given credentials\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token/refresh/");
			then.status(200).body("{\"access\":\"unused\"}");
		})
		.await;
	let err = harness
		.session
		.login(&Credentials::new("ada@example.com", "wrong"))
		.await
		.expect_err("Bad credentials should be rejected.");

	match err {
		Error::Api(api) => {
			assert_eq!(api.status, 401);
			assert_eq!(
				api.body,
				"{\"detail\":\"No active account found with the given credentials\"}"
			);
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	token.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(harness.backend.is_empty());
	assert!(harness.navigator.history().is_empty());
}

#[tokio::test]
async fn malformed_token_response_reports_the_field() {
	let server = MockServer::start_async().await;
	let harness = build_reqwest_test_session(&server.base_url());

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN);
			then.status(200).body("{\"access\":\"access-1\"}");
		})
		.await;

	let err = harness
		.session
		.login(&Credentials::new("ada@example.com", "hunter2"))
		.await
		.expect_err("A token pair without a refresh token should not decode.");

	assert!(matches!(err, Error::Decode(_)));
	assert!(harness.backend.is_empty());
}

#[tokio::test]
async fn restore_revalidates_stored_tokens() {
	let server = MockServer::start_async().await;
	let harness = build_reqwest_test_session(&server.base_url());

	assert_eq!(harness.session.restore().await.expect("Restore should succeed."), None);

	harness
		.session
		.store
		.set_access_and_refresh(&TokenSecret::new("access-1"), &TokenSecret::new("refresh-1"))
		.expect("Seeding the token pair should succeed.");

	let identity = server
		.mock_async(|when, then| {
			when.method(GET).path(IDENTITY).header("authorization", "Bearer access-1");
			then.status(200).body("{\"id\":7}");
		})
		.await;
	let restored = harness
		.session
		.restore()
		.await
		.expect("Restore should succeed.")
		.expect("A valid session should restore its identity.");

	identity.assert_calls_async(1).await;

	assert_eq!(restored.get("id"), Some(&serde_json::json!(7)));
	assert_eq!(harness.session.cached_identity().expect("Read should succeed."), Some(restored));
}

#[tokio::test]
async fn restore_clears_a_session_the_server_no_longer_accepts() {
	let server = MockServer::start_async().await;
	let harness = build_reqwest_test_session(&server.base_url());

	harness
		.session
		.store
		.set_access_and_refresh(&TokenSecret::new("access-1"), &TokenSecret::new("refresh-1"))
		.expect("Seeding the token pair should succeed.");
	server
		.mock_async(|when, then| {
			when.method(GET).path(IDENTITY);
			then.status(403).body("{\"detail\":\"User is inactive\"}");
		})
		.await;

	assert_eq!(harness.session.restore().await.expect("Restore should succeed."), None);
	assert!(harness.backend.is_empty());
}

#[tokio::test]
async fn file_backed_sessions_survive_a_restart() {
	let server = MockServer::start_async().await;
	let path = env::temp_dir().join(format!(
		"bearer_session_lifecycle_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	));
	let open_session = || {
		let backend =
			FileBackend::open(&path).expect("File backend should open the snapshot path.");

		ReqwestTestSession::with_transport(
			test_config(&server.base_url()),
			CredentialStore::new(Arc::new(backend) as Arc<dyn SessionBackend>),
			ReqwestTransport::default(),
			Arc::new(MemoryNavigator::at("/")) as Arc<dyn Navigator>,
		)
	};

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN);
			then.status(200).body("{\"access\":\"access-1\",\"refresh\":\"refresh-1\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(IDENTITY);
			then.status(200).body("{\"id\":7}");
		})
		.await;

	open_session()
		.login(&Credentials::new("ada@example.com", "hunter2"))
		.await
		.expect("Login should succeed.");

	let restarted = open_session();

	assert_eq!(
		restarted.store.get(TokenKind::Access).expect("Read should succeed."),
		Some(TokenSecret::new("access-1"))
	);
	assert!(restarted.cached_identity().expect("Read should succeed.").is_some());

	restarted.logout().expect("Logout should succeed.");

	assert_eq!(open_session().store.get(TokenKind::Refresh).expect("Read should succeed."), None);

	fs::remove_file(&path).unwrap_or_else(|e| {
		panic!("Failed to remove temporary session snapshot {}: {e}", path.display())
	});
}

//! Authenticated request pipeline: annotation, single-flight refresh, guarded replay, and
//! session teardown.
//!
//! A [`Session`] composes one [`CredentialStore`], one [`HttpTransport`], and one
//! [`RefreshCoordinator`]. Every call made through [`Session::send`] is annotated with the
//! stored access token, and a `401` on a protected call is recovered by exchanging the refresh
//! token exactly once per expiry episode before the call is replayed a single time.

pub mod annotate;
pub mod coordinator;
pub mod exchange;
pub mod guard;
pub mod lifecycle;
pub mod terminate;

pub use annotate::*;
pub use coordinator::*;
pub use exchange::*;
pub use guard::*;
pub use terminate::*;

// self
use crate::{_prelude::*, config::SessionConfig, http::HttpTransport, store::CredentialStore};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Session specialized for the crate's default reqwest transport.
pub type ReqwestSession = Session<ReqwestTransport>;

/// Client-side session bound to one API base URL.
///
/// Cloning is cheap and every clone shares the same store, transport, and coordinator, so a
/// refresh started by one clone is joined by calls made through any other.
pub struct Session<T>
where
	T: ?Sized + HttpTransport,
{
	/// Validated endpoint layout.
	pub config: Arc<SessionConfig>,
	/// Transport used for every outbound call, including authentication exchanges.
	pub transport: Arc<T>,
	/// Credential store holding the tokens and cached identity.
	pub store: CredentialStore,
	/// Single-flight refresh coordinator owned by this session.
	pub coordinator: Arc<RefreshCoordinator<T>>,
	login_guard: Arc<AsyncMutex<()>>,
}
impl<T> Session<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a session that reuses the caller-provided transport.
	pub fn with_transport(
		config: SessionConfig,
		store: CredentialStore,
		transport: impl Into<Arc<T>>,
		navigator: Arc<dyn Navigator>,
	) -> Self {
		let config = Arc::new(config);
		let transport = transport.into();
		let terminator = SessionTerminator::new(config.clone(), store.clone(), navigator);
		let exchange = TokenExchange::new(config.clone(), transport.clone());
		let coordinator =
			Arc::new(RefreshCoordinator::new(exchange, store.clone(), terminator));

		Self { config, transport, store, coordinator, login_guard: Default::default() }
	}
}
#[cfg(feature = "reqwest")]
impl Session<ReqwestTransport> {
	/// Creates a new session that provisions its own reqwest transport.
	pub fn new(
		config: SessionConfig,
		store: CredentialStore,
		navigator: Arc<dyn Navigator>,
	) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default(), navigator)
	}
}
impl<T> Clone for Session<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			store: self.store.clone(),
			coordinator: self.coordinator.clone(),
			login_guard: self.login_guard.clone(),
		}
	}
}
impl<T> Debug for Session<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("base_url", &self.config.base_url.as_str())
			.field("refreshing", &self.coordinator.is_refreshing())
			.finish()
	}
}

//! Session teardown after an unrecoverable refresh failure, and the navigation sink it drives.

// self
use crate::{
	_prelude::*,
	config::SessionConfig,
	http::HttpTransport,
	obs,
	session::RefreshCoordinator,
	store::{CredentialStore, StoreError},
};

/// Navigation sink that knows where the user is and can send them elsewhere.
///
/// Implementations perform a full, session-resetting redirect in [`Navigator::navigate`]; the
/// session never calls back into itself from there.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Returns the current in-app location (path plus optional query).
	fn current_location(&self) -> String;

	/// Redirects to `target`.
	fn navigate(&self, target: &str);
}

/// In-process [`Navigator`] that records every redirect; used by CLIs, daemons, and tests.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
	location: Mutex<String>,
	history: Mutex<Vec<String>>,
}
impl MemoryNavigator {
	/// Creates a navigator positioned at `location`.
	pub fn at(location: impl Into<String>) -> Self {
		Self { location: Mutex::new(location.into()), history: Default::default() }
	}

	/// Moves to `location` without recording a redirect.
	pub fn visit(&self, location: impl Into<String>) {
		*self.location.lock() = location.into();
	}

	/// Returns every redirect target in order.
	pub fn history(&self) -> Vec<String> {
		self.history.lock().clone()
	}
}
impl Navigator for MemoryNavigator {
	fn current_location(&self) -> String {
		self.location.lock().clone()
	}

	fn navigate(&self, target: &str) {
		self.visit(target);
		self.history.lock().push(target.to_owned());
	}
}

/// Tears a session down: clears credentials, resets the coordinator, redirects to login.
#[derive(Clone)]
pub struct SessionTerminator {
	config: Arc<SessionConfig>,
	store: CredentialStore,
	navigator: Arc<dyn Navigator>,
}
impl SessionTerminator {
	/// Creates a terminator bound to the session's store and navigation sink.
	pub fn new(
		config: Arc<SessionConfig>,
		store: CredentialStore,
		navigator: Arc<dyn Navigator>,
	) -> Self {
		Self { config, store, navigator }
	}

	/// Performs the teardown and returns the redirect target.
	///
	/// The redirect happens even if clearing the store fails; the store error is returned
	/// afterwards.
	pub fn terminate<T>(&self, coordinator: &RefreshCoordinator<T>) -> Result<String, StoreError>
	where
		T: ?Sized + HttpTransport,
	{
		let location = self.navigator.current_location();
		let cleared = self.store.clear_all();

		coordinator.reset();

		let target = self.config.login_redirect(Some(&location));

		obs::session_terminated(&target);
		self.navigator.navigate(&target);

		cleared.map(|()| target)
	}
}
impl Debug for SessionTerminator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionTerminator").field("login_path", &self.config.login_path).finish()
	}
}

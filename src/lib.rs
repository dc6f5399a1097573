//! Bearer-token session layer for API clients: attach credentials to every call, refresh an
//! expired access token exactly once per expiry episode, and replay the calls that failed while
//! the refresh was in flight.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod session;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::SessionConfig,
		http::ReqwestTransport,
		session::{MemoryNavigator, Navigator, Session},
		store::{CredentialStore, MemoryBackend, SessionBackend},
	};

	/// Session type alias used by reqwest-backed integration tests.
	pub type ReqwestTestSession = Session<ReqwestTransport>;

	/// Handles returned by [`build_reqwest_test_session`] so tests can inspect side effects.
	pub struct TestHarness {
		/// Session under test.
		pub session: ReqwestTestSession,
		/// Backend holding the persisted credentials.
		pub backend: Arc<MemoryBackend>,
		/// Navigation sink recording redirects.
		pub navigator: Arc<MemoryNavigator>,
	}

	/// Builds a [`SessionConfig`] rooted at the `/api/` path of a mock server base URL.
	pub fn test_config(server_base: &str) -> SessionConfig {
		let base = Url::parse(&format!("{}/api/", server_base.trim_end_matches('/')))
			.expect("Mock server base URL should parse.");

		SessionConfig::builder(base).build().expect("Default test configuration should be valid.")
	}

	/// Constructs a [`Session`] backed by an in-memory store, a recording navigator, and the
	/// reqwest transport used across integration tests.
	pub fn build_reqwest_test_session(server_base: &str) -> TestHarness {
		let backend = Arc::new(MemoryBackend::default());
		let store = CredentialStore::new(backend.clone() as Arc<dyn SessionBackend>);
		let navigator = Arc::new(MemoryNavigator::at("/dashboard"));
		let session = Session::with_transport(
			test_config(server_base),
			store,
			ReqwestTransport::default(),
			navigator.clone() as Arc<dyn Navigator>,
		);

		TestHarness { session, backend, navigator }
	}
}

mod _prelude {
	pub use std::{
		collections::{HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

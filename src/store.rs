//! Credential store contracts and built-in persistence backends.
//!
//! [`SessionBackend`] is the persistence medium: a synchronous key-value map over the three
//! [`StoreKey`]s. [`CredentialStore`] layers the typed session operations on top and holds no
//! validation logic of its own.

pub mod file;
pub mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

// self
use crate::{
	_prelude::*,
	auth::{Identity, TokenKind, TokenSecret},
	obs,
};

/// Storage backend contract implemented by session persistence media.
///
/// Multi-key writes and removals must be applied under one critical section so other readers
/// never observe a partially cleared or partially written session.
pub trait SessionBackend
where
	Self: Send + Sync,
{
	/// Fetches the raw value stored under `key`.
	fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError>;

	/// Writes every entry in one atomic step.
	fn set(&self, entries: &[(StoreKey, String)]) -> Result<(), StoreError>;

	/// Removes every key in one atomic step; missing keys are ignored.
	fn remove(&self, keys: &[StoreKey]) -> Result<(), StoreError>;
}

/// Keys held by the persistence medium.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKey {
	/// Access token.
	Access,
	/// Refresh token.
	Refresh,
	/// Serialized identity blob.
	#[serde(rename = "user")]
	Identity,
}
impl StoreKey {
	/// Every key owned by a session.
	pub const ALL: [StoreKey; 3] = [StoreKey::Access, StoreKey::Refresh, StoreKey::Identity];

	/// Returns the persisted key name.
	pub const fn as_str(self) -> &'static str {
		match self {
			StoreKey::Access => "access",
			StoreKey::Refresh => "refresh",
			StoreKey::Identity => "user",
		}
	}
}
impl From<TokenKind> for StoreKey {
	fn from(kind: TokenKind) -> Self {
		match kind {
			TokenKind::Access => StoreKey::Access,
			TokenKind::Refresh => StoreKey::Refresh,
		}
	}
}

/// Error type produced by [`SessionBackend`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Typed session store over a [`SessionBackend`].
#[derive(Clone)]
pub struct CredentialStore(Arc<dyn SessionBackend>);
impl CredentialStore {
	/// Wraps a backend.
	pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
		Self(backend)
	}

	/// Creates a store over a fresh [`MemoryBackend`].
	pub fn in_memory() -> Self {
		Self::new(Arc::new(MemoryBackend::default()))
	}

	/// Returns the stored token of the given kind.
	pub fn get(&self, kind: TokenKind) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.0.get(kind.into())?.map(TokenSecret::new))
	}

	/// Persists a freshly issued token pair.
	pub fn set_access_and_refresh(
		&self,
		access: &TokenSecret,
		refresh: &TokenSecret,
	) -> Result<(), StoreError> {
		self.0.set(&[
			(StoreKey::Access, access.expose().to_owned()),
			(StoreKey::Refresh, refresh.expose().to_owned()),
		])
	}

	/// Replaces only the access token, keeping the refresh token.
	pub fn set_access(&self, access: &TokenSecret) -> Result<(), StoreError> {
		self.0.set(&[(StoreKey::Access, access.expose().to_owned())])
	}

	/// Caches the identity blob.
	pub fn set_identity(&self, identity: &Identity) -> Result<(), StoreError> {
		let blob = serde_json::to_string(identity)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

		self.0.set(&[(StoreKey::Identity, blob)])
	}

	/// Returns the cached identity; a blob that no longer parses reads as absent.
	pub fn get_identity(&self) -> Result<Option<Identity>, StoreError> {
		let Some(blob) = self.0.get(StoreKey::Identity)? else {
			return Ok(None);
		};

		match serde_json::from_str(&blob) {
			Ok(identity) => Ok(Some(identity)),
			Err(e) => {
				obs::identity_discarded(&e);

				Ok(None)
			},
		}
	}

	/// Removes access token, refresh token, and identity in one step.
	pub fn clear_all(&self) -> Result<(), StoreError> {
		self.0.remove(&StoreKey::ALL)
	}
}
impl Debug for CredentialStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CredentialStore(..)")
	}
}

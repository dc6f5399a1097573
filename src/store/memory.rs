//! Thread-safe in-memory [`SessionBackend`] for tests, demos, and short-lived processes.

// self
use crate::{
	_prelude::*,
	store::{SessionBackend, StoreError, StoreKey},
};

/// Storage backend that keeps the session in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend(Arc<RwLock<HashMap<StoreKey, String>>>);
impl MemoryBackend {
	/// Returns a copy of every stored entry.
	pub fn snapshot(&self) -> HashMap<StoreKey, String> {
		self.0.read().clone()
	}

	/// Returns `true` if no key is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl SessionBackend for MemoryBackend {
	fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
		Ok(self.0.read().get(&key).cloned())
	}

	fn set(&self, entries: &[(StoreKey, String)]) -> Result<(), StoreError> {
		let mut guard = self.0.write();

		for (key, value) in entries {
			guard.insert(*key, value.clone());
		}

		Ok(())
	}

	fn remove(&self, keys: &[StoreKey]) -> Result<(), StoreError> {
		let mut guard = self.0.write();

		for key in keys {
			guard.remove(key);
		}

		Ok(())
	}
}

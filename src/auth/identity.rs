//! Cached user identity returned by the identity endpoint.

// crates.io
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Opaque user record cached alongside the session tokens.
///
/// The identity endpoint decides the shape; the session only requires a JSON object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Map<String, Value>);
impl Identity {
	/// Wraps an already decoded JSON object.
	pub fn new(fields: Map<String, Value>) -> Self {
		Self(fields)
	}

	/// Returns the raw value stored under `field`.
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.0.get(field)
	}

	/// Returns `field` when it holds a JSON string.
	pub fn get_str(&self, field: &str) -> Option<&str> {
		self.get(field).and_then(Value::as_str)
	}

	/// Borrows every field of the record.
	pub fn fields(&self) -> &Map<String, Value> {
		&self.0
	}

	/// Consumes the identity and returns its fields.
	pub fn into_fields(self) -> Map<String, Value> {
		self.0
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identity_reads_string_fields() {
		let identity: Identity = serde_json::from_str("{\"id\":7,\"email\":\"ada@example.com\"}")
			.expect("Identity fixture should decode.");

		assert_eq!(identity.get_str("email"), Some("ada@example.com"));
		assert_eq!(identity.get_str("id"), None);
		assert_eq!(identity.get("id"), Some(&Value::from(7)));
	}

	#[test]
	fn identity_rejects_non_objects() {
		assert!(serde_json::from_str::<Identity>("[1,2,3]").is_err());
	}
}

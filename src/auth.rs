//! Auth-domain value types: token secrets, login credentials, cached identities, and claims.

pub mod claims;
pub mod credentials;
pub mod identity;
pub mod token;

pub use credentials::*;
pub use identity::*;
pub use token::{secret::*, *};

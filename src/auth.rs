//! Caller authentication: header parsing, token validation strategies, and identities.

pub mod claims;
pub mod host;
pub mod identity;
pub mod scheme;
pub mod secret;
pub mod validator;

pub use claims::*;
pub use host::*;
pub use identity::*;
pub use scheme::*;
pub use secret::*;
pub use validator::*;
